//! Core data models for the SkyGuard compliance platform.
//!
//! Registry entities (drones, pilots, type certificates) are read-only from
//! the gate's perspective; operations entities (flight plans, artifacts,
//! flight logs) carry the lifecycle state the core components act on.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered drone lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DroneStatus {
    Draft,
    Registered,
    Active,
    TransferPending,
    Deregistered,
    Lost,
    Damaged,
}

/// A registered drone. The UIN is immutable once assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub id: Uuid,
    /// Unique Identification Number; empty/absent until registration completes.
    pub uin: Option<String>,
    pub serial_number: Option<String>,
    pub status: DroneStatus,
    pub type_certificate_id: Uuid,
    pub pilot_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub insurance_policy_number: Option<String>,
    pub insurance_expiry_date: Option<NaiveDate>,
}

/// Certification lifecycle for a type certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificationStatus {
    Draft,
    Submitted,
    Certified,
    Suspended,
    Revoked,
}

/// Weight classes ordered lightest to heaviest. A pilot rated for a class
/// may fly that class and anything lighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeightClass {
    Nano,
    Micro,
    Small,
    Medium,
    Large,
}

/// Per-model specification referenced by many drones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeCertificate {
    pub id: Uuid,
    pub model_name: String,
    pub weight_class: WeightClass,
    pub certification_status: CertificationStatus,
    pub npnt_compliant: bool,
    pub operating_altitude_min_ft: i32,
    pub operating_altitude_max_ft: i32,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PilotStatus {
    Active,
    Suspended,
    Expired,
    Revoked,
}

/// Remote pilot with an RPC (Remote Pilot Certificate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pilot {
    pub id: Uuid,
    pub rpc_number: Option<String>,
    pub class_rating: WeightClass,
    pub status: PilotStatus,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaintenanceStatus {
    Open,
    InProgress,
    Completed,
    Verified,
}

/// Open maintenance work item on a drone. Critical items block flight
/// until completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceItem {
    pub id: Uuid,
    pub drone_id: Uuid,
    pub is_critical: bool,
    pub status: MaintenanceStatus,
    pub description: Option<String>,
}

/// Airspace zone classification. Red prohibits flight outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZoneCategory {
    Green,
    Yellow,
    Red,
}

/// A maintained airspace zone record with a closed polygon boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirspaceZone {
    pub id: String,
    pub name: String,
    pub category: ZoneCategory,
    /// Closed ring of [lat, lon] pairs (first == last).
    pub polygon: Vec<[f64; 2]>,
    /// Altitude band the restriction applies to, in feet.
    pub lower_altitude_ft: i32,
    pub upper_altitude_ft: i32,
    pub active: bool,
}

/// Flight plan lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    InProgress,
    Completed,
    Aborted,
}

/// A planned flight: area polygon, altitude bounds, and time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightPlan {
    pub id: Uuid,
    pub drone_id: Uuid,
    pub pilot_id: Uuid,
    pub organization_id: Option<Uuid>,
    /// Closed ring of [lat, lon] pairs describing the flight area.
    pub polygon: Vec<[f64; 2]>,
    pub min_altitude_ft: i32,
    pub max_altitude_ft: i32,
    pub planned_start: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    /// Most restrictive zone touched, set when zone validation runs.
    pub zone_status: Option<ZoneCategory>,
    pub status: FlightStatus,
    pub created_at: DateTime<Utc>,
}

/// Usage lifecycle of a permission artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactStatus {
    Valid,
    Used,
    Expired,
    Revoked,
}

/// Signed, time-bounded flight authorization. One-to-one with a flight plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionArtifact {
    pub id: Uuid,
    pub flight_plan_id: Uuid,
    /// Canonical JSON payload the signature covers.
    pub payload_json: String,
    /// Base64-encoded Ed25519 signature over the payload bytes.
    pub signature: String,
    pub issued_at: DateTime<Utc>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub status: ArtifactStatus,
    pub used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
}

/// One telemetry record in a flight's hash chain. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightLogEntry {
    pub drone_id: Uuid,
    pub flight_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    #[serde(default)]
    pub altitude_agl_m: Option<f64>,
    #[serde(default)]
    pub ground_speed_mps: Option<f64>,
    #[serde(default)]
    pub battery_percentage: Option<i32>,
    #[serde(default)]
    pub gps_satellites: Option<i32>,
    pub sequence_number: i64,
    /// Hash of the previous entry, or the genesis constant for sequence 0.
    pub previous_hash: String,
    /// SHA-256 over the canonical entry string (see `chain`).
    pub entry_hash: String,
}

/// Write-once per-flight aggregate computed from the log chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightLogSummary {
    pub flight_plan_id: Uuid,
    pub drone_id: Uuid,
    pub takeoff_time: DateTime<Utc>,
    pub landing_time: DateTime<Utc>,
    pub total_flight_duration_sec: i64,
    pub total_distance_km: f64,
    pub max_altitude_m: Option<f64>,
    pub avg_altitude_m: Option<f64>,
    pub max_speed_mps: Option<f64>,
    pub avg_speed_mps: Option<f64>,
    pub battery_start_percentage: Option<i32>,
    pub battery_end_percentage: Option<i32>,
    pub altitude_violations: i64,
    pub total_log_entries: i64,
    pub first_entry_hash: Option<String>,
    pub last_entry_hash: Option<String>,
    pub chain_verified: bool,
}

/// Closed set of violation types the detector can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    LogIntegrityViolation,
    UnauthorizedFlight,
    ZoneBreach,
    AltitudeViolation,
    GpsQualityLow,
    BatteryCritical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationStatus {
    Open,
    UnderReview,
    Resolved,
    Escalated,
}

/// Compliance violation record. Append-mostly; never silently deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceViolation {
    pub id: Uuid,
    pub drone_id: Option<Uuid>,
    pub pilot_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub flight_plan_id: Option<Uuid>,
    pub violation_type: ViolationType,
    pub severity: ViolationSeverity,
    pub description: String,
    pub evidence: serde_json::Value,
    pub status: ViolationStatus,
    pub detected_by: String,
    pub created_at: DateTime<Utc>,
}

impl ViolationType {
    /// Default severity mapping for detector-emitted violations.
    pub fn severity(self) -> ViolationSeverity {
        match self {
            Self::LogIntegrityViolation => ViolationSeverity::Critical,
            Self::UnauthorizedFlight => ViolationSeverity::Critical,
            Self::ZoneBreach => ViolationSeverity::High,
            Self::AltitudeViolation => ViolationSeverity::Medium,
            Self::GpsQualityLow => ViolationSeverity::Low,
            Self::BatteryCritical => ViolationSeverity::Medium,
        }
    }
}
