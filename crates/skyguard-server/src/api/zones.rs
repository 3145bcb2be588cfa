//! Airspace zone handlers.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use skyguard_core::models::AirspaceZone;
use skyguard_core::spatial::validate_ring;
use skyguard_core::zones::ZoneDecision;

use crate::api::error::ApiError;
use crate::persistence::zones as zone_store;
use crate::state::AppState;

pub async fn create_zone(
    State(state): State<Arc<AppState>>,
    Json(zone): Json<AirspaceZone>,
) -> Result<(StatusCode, Json<AirspaceZone>), ApiError> {
    validate_ring(&zone.polygon)?;
    if zone.upper_altitude_ft < zone.lower_altitude_ft {
        return Err(ApiError::Validation(
            "upper_altitude_ft must be at least lower_altitude_ft".to_string(),
        ));
    }

    zone_store::upsert_zone(state.db().pool(), &zone).await?;
    state.reload_zones().await?;
    tracing::info!(zone_id = %zone.id, category = ?zone.category, "zone upserted");

    Ok((StatusCode::CREATED, Json(zone)))
}

pub async fn list_zones(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AirspaceZone>>, ApiError> {
    let zones = zone_store::load_all_zones(state.db().pool()).await?;
    Ok(Json(zones))
}

/// A point lookup or an area lookup, distinguished by shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ValidateZoneRequest {
    Point {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        altitude_ft: Option<i32>,
    },
    Area {
        polygon: Vec<[f64; 2]>,
        #[serde(default)]
        min_altitude_ft: i32,
        max_altitude_ft: i32,
    },
}

/// Classify a point or flight area against the maintained zone dataset.
pub async fn validate_zone(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateZoneRequest>,
) -> Result<Json<ZoneDecision>, ApiError> {
    let zones = state.zones().read().await;
    let decision = match req {
        ValidateZoneRequest::Point {
            latitude,
            longitude,
            altitude_ft,
        } => {
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return Err(ApiError::Validation(format!(
                    "coordinate out of range: {latitude}, {longitude}"
                )));
            }
            zones.classify_point(latitude, longitude, altitude_ft)
        }
        ValidateZoneRequest::Area {
            polygon,
            min_altitude_ft,
            max_altitude_ft,
        } => zones.classify_polygon(&polygon, min_altitude_ft, max_altitude_ft)?,
    };
    Ok(Json(decision))
}
