pub mod artifact;
pub mod chain;
pub mod error;
pub mod gate;
pub mod models;
pub mod spatial;
pub mod summary;
pub mod violations;
pub mod zones;

pub use artifact::{
    consume, verify_signature, ArtifactPayload, ArtifactSigner, ConsumeOutcome, ARTIFACT_VERSION,
};
pub use chain::{
    compute_hash, entry_hash, expect_next, verify_chain, verify_chain_from, Anomaly, AnomalyKind,
    ChainReport, ChainTail, GENESIS_HASH,
};
pub use error::{ArtifactError, ChainError, GeometryError};
pub use gate::{evaluate, CheckFailure, GateCheckId, GateContext, GateDecision, GATE_CHECKS};
pub use models::{
    AirspaceZone, ArtifactStatus, CertificationStatus, ComplianceViolation, Drone, DroneStatus,
    FlightLogEntry, FlightLogSummary, FlightPlan, FlightStatus, MaintenanceItem,
    MaintenanceStatus, PermissionArtifact, Pilot, PilotStatus, TypeCertificate, ViolationSeverity,
    ViolationStatus, ViolationType, WeightClass, ZoneCategory,
};
pub use spatial::haversine_distance;
pub use summary::summarize;
pub use violations::{scan, ScanInput, METERS_TO_FEET};
pub use zones::{ZoneDecision, ZoneIndex};
