//! Server configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// Path to the 32-byte Ed25519 seed file; created on first run.
    pub signing_key_path: String,
    /// Minutes of validity granted beyond a plan's window on each side.
    pub artifact_grace_min: i64,
    /// Configured floor for planned flight altitude, feet.
    pub min_altitude_ft: i32,
    /// Feet above the type certificate ceiling tolerated before the
    /// detector raises an altitude violation.
    pub altitude_tolerance_ft: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SKYGUARD_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3400),
            database_path: env::var("SKYGUARD_DB")
                .unwrap_or_else(|_| "data/skyguard.db".to_string()),
            database_max_connections: env::var("SKYGUARD_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            signing_key_path: env::var("SKYGUARD_SIGNING_KEY")
                .unwrap_or_else(|_| "data/signing.key".to_string()),
            artifact_grace_min: env::var("SKYGUARD_ARTIFACT_GRACE_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
            min_altitude_ft: env::var("SKYGUARD_MIN_ALTITUDE_FT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            altitude_tolerance_ft: env::var("SKYGUARD_ALTITUDE_TOLERANCE_FT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50.0),
        }
    }
}
