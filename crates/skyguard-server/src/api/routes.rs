//! REST API routes.

use axum::{
    routing::{get, post},
    Router,
};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde_json::json;
use std::sync::Arc;

use crate::api::{flights, registry, zones};
use crate::state::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Registry
        .route("/v1/drones", post(registry::upsert_drone))
        .route("/v1/drones/:id", get(registry::get_drone))
        .route("/v1/pilots", post(registry::upsert_pilot))
        .route("/v1/type-certificates", post(registry::upsert_type_certificate))
        .route("/v1/maintenance", post(registry::upsert_maintenance_item))
        // Zones
        .route("/v1/zones", post(zones::create_zone).get(zones::list_zones))
        .route("/v1/zones/validate", post(zones::validate_zone))
        // Flight plans and authorization
        .route("/v1/flights/plans", post(flights::create_flight_plan))
        .route("/v1/flights/plans/:id", get(flights::get_flight_plan))
        .route("/v1/flights/validate-npnt", post(flights::validate_npnt))
        .route("/v1/flights/plans/:id/start", post(flights::start_flight))
        .route("/v1/flights/plans/:id/complete", post(flights::complete_flight))
        .route("/v1/flights/plans/:id/artifact", get(flights::get_plan_artifact))
        // Flight logs
        .route("/v1/flights/logs/ingest", post(flights::ingest_logs))
        .route("/v1/flights/plans/:id/logs", get(flights::get_flight_logs))
        .route("/v1/flights/plans/:id/logs/verify", get(flights::verify_flight_logs))
        .route("/v1/flights/plans/:id/summary", get(flights::get_flight_summary))
        .route("/v1/flights/plans/:id/violations", get(flights::get_flight_violations))
        // Artifacts
        .route("/v1/artifacts/:id", get(flights::get_artifact))
        .route("/v1/artifacts/:id/revoke", post(flights::revoke_artifact))
        .route("/v1/artifacts/verify", post(flights::verify_artifact))
        .route("/v1/public-key", get(public_key))
}

/// Publish the issuing public key so artifact holders can verify
/// signatures without calling back.
async fn public_key(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    let key = state.signer().verifying_key();
    axum::Json(json!({
        "algorithm": "ed25519",
        "public_key": B64.encode(key.to_bytes()),
    }))
}
