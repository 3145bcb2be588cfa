//! Persistence layer for the SkyGuard server.
//!
//! SQLite-backed storage for registry entities, flight plans, permission
//! artifacts, flight logs, summaries, and violations. Flight logs and
//! violations are append-only: those modules expose insert and select
//! only.

pub mod artifacts;
pub mod db;
pub mod flight_logs;
pub mod flight_plans;
pub mod registry;
pub mod summaries;
pub mod violations;
pub mod zones;

pub use db::{init_database, Database};
