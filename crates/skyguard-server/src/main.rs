//! SkyGuard server - NPNT flight authorization and tamper-evident logs

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skyguard_core::artifact::ArtifactSigner;
use skyguard_server::config::Config;
use skyguard_server::state::AppState;
use skyguard_server::{api, persistence, signing};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skyguard_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting SkyGuard server...");

    let config = Config::from_env();
    let port = config.server_port;

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;
    let seed = signing::load_or_create_seed(&config.signing_key_path)?;
    let signer = ArtifactSigner::from_seed(seed, config.artifact_grace_min);

    let state = Arc::new(AppState::new(db, config, signer));
    state.reload_zones().await?;

    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
