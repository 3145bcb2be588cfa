//! Shared library surface for SkyGuard server utilities and tests.

pub mod api;
pub mod config;
pub mod persistence;
pub mod signing;
pub mod state;
