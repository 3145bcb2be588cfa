//! Registry handlers for drones, pilots, type certificates, and
//! maintenance items.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use skyguard_core::models::{Drone, MaintenanceItem, Pilot, TypeCertificate};

use crate::api::error::ApiError;
use crate::persistence::registry;
use crate::state::AppState;

pub async fn upsert_drone(
    State(state): State<Arc<AppState>>,
    Json(drone): Json<Drone>,
) -> Result<(StatusCode, Json<Drone>), ApiError> {
    registry::upsert_drone(state.db().pool(), &drone).await?;
    Ok((StatusCode::CREATED, Json(drone)))
}

pub async fn get_drone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Drone>, ApiError> {
    let drone = registry::load_drone(state.db().pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("drone {id} not found")))?;
    Ok(Json(drone))
}

pub async fn upsert_pilot(
    State(state): State<Arc<AppState>>,
    Json(pilot): Json<Pilot>,
) -> Result<(StatusCode, Json<Pilot>), ApiError> {
    registry::upsert_pilot(state.db().pool(), &pilot).await?;
    Ok((StatusCode::CREATED, Json(pilot)))
}

pub async fn upsert_type_certificate(
    State(state): State<Arc<AppState>>,
    Json(tc): Json<TypeCertificate>,
) -> Result<(StatusCode, Json<TypeCertificate>), ApiError> {
    if tc.operating_altitude_max_ft < tc.operating_altitude_min_ft {
        return Err(ApiError::Validation(
            "operating_altitude_max_ft must be at least operating_altitude_min_ft".to_string(),
        ));
    }
    registry::upsert_type_certificate(state.db().pool(), &tc).await?;
    Ok((StatusCode::CREATED, Json(tc)))
}

pub async fn upsert_maintenance_item(
    State(state): State<Arc<AppState>>,
    Json(item): Json<MaintenanceItem>,
) -> Result<(StatusCode, Json<MaintenanceItem>), ApiError> {
    registry::upsert_maintenance_item(state.db().pool(), &item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}
