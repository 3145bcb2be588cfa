//! Error taxonomy for the core components.
//!
//! All of these are recoverable, caller-surfaced errors. Storage and
//! transport faults live at the server layer; nothing here is retried
//! locally.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::gate::CheckFailure;
use crate::models::ArtifactStatus;

/// Zone classifier input rejection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("polygon must have at least 3 distinct vertices")]
    TooFewVertices,
    #[error("polygon ring is not closed (first vertex must equal last)")]
    UnclosedRing,
    #[error("polygon is self-intersecting")]
    SelfIntersecting,
    #[error("coordinate out of range: lat {lat}, lon {lon}")]
    CoordinateOutOfRange { lat: f64, lon: f64 },
}

/// Log append ordering rejection. Doubles as the optimistic-concurrency
/// guard for racing appends on the same flight.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch { expected: i64, got: i64 },
    #[error("predecessor hash mismatch at sequence {sequence}")]
    PredecessorMismatch { sequence: i64 },
}

/// Permission artifact lifecycle errors.
#[derive(Debug, Clone, Error)]
pub enum ArtifactError {
    #[error("gate evaluation did not pass ({} failing checks)", failures.len())]
    GateNotPassed { failures: Vec<CheckFailure> },
    #[error("artifact has already been used")]
    AlreadyUsed,
    #[error("artifact is not in a consumable state ({status:?})")]
    NotValid { status: ArtifactStatus },
    #[error("artifact expired at {valid_until}")]
    Expired { valid_until: DateTime<Utc> },
    #[error("artifact signature verification failed")]
    BadSignature,
}
