//! API routes for the SkyGuard server.

pub mod error;
pub mod flights;
pub mod registry;
mod routes;
pub mod zones;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}
