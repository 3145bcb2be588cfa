//! Violation persistence. Insert and select only; violation records are
//! evidence and are never edited or deleted here (review workflows update
//! status elsewhere, not through the detector path).

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use skyguard_core::models::{
    ComplianceViolation, ViolationSeverity, ViolationStatus, ViolationType,
};

use super::registry::parse_uuid;

pub async fn insert_violation(pool: &SqlitePool, violation: &ComplianceViolation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO violations (
            id, drone_id, pilot_id, organization_id, flight_plan_id,
            violation_type, severity, description, evidence,
            status, detected_by, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(violation.id.to_string())
    .bind(violation.drone_id.map(|id| id.to_string()))
    .bind(violation.pilot_id.map(|id| id.to_string()))
    .bind(violation.organization_id.map(|id| id.to_string()))
    .bind(violation.flight_plan_id.map(|id| id.to_string()))
    .bind(format!("{:?}", violation.violation_type))
    .bind(format!("{:?}", violation.severity))
    .bind(&violation.description)
    .bind(violation.evidence.to_string())
    .bind(format!("{:?}", violation.status))
    .bind(&violation.detected_by)
    .bind(violation.created_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_violations_for_plan(
    pool: &SqlitePool,
    flight_plan_id: Uuid,
) -> Result<Vec<ComplianceViolation>> {
    let rows = sqlx::query_as::<_, ViolationRow>(
        "SELECT id, drone_id, pilot_id, organization_id, flight_plan_id, violation_type, severity, description, evidence, status, detected_by, created_at FROM violations WHERE flight_plan_id = ?1 ORDER BY created_at"
    )
    .bind(flight_plan_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

#[derive(sqlx::FromRow)]
struct ViolationRow {
    id: String,
    drone_id: Option<String>,
    pilot_id: Option<String>,
    organization_id: Option<String>,
    flight_plan_id: Option<String>,
    violation_type: String,
    severity: String,
    description: String,
    evidence: String,
    status: String,
    detected_by: String,
    created_at: String,
}

impl TryFrom<ViolationRow> for ComplianceViolation {
    type Error = anyhow::Error;

    fn try_from(row: ViolationRow) -> Result<Self> {
        let violation_type = match row.violation_type.as_str() {
            "LogIntegrityViolation" => ViolationType::LogIntegrityViolation,
            "UnauthorizedFlight" => ViolationType::UnauthorizedFlight,
            "ZoneBreach" => ViolationType::ZoneBreach,
            "AltitudeViolation" => ViolationType::AltitudeViolation,
            "GpsQualityLow" => ViolationType::GpsQualityLow,
            _ => ViolationType::BatteryCritical,
        };
        let severity = match row.severity.as_str() {
            "Low" => ViolationSeverity::Low,
            "Medium" => ViolationSeverity::Medium,
            "High" => ViolationSeverity::High,
            _ => ViolationSeverity::Critical,
        };
        let status = match row.status.as_str() {
            "Open" => ViolationStatus::Open,
            "UnderReview" => ViolationStatus::UnderReview,
            "Resolved" => ViolationStatus::Resolved,
            _ => ViolationStatus::Escalated,
        };
        let created_at: DateTime<Utc> =
            DateTime::parse_from_rfc3339(&row.created_at)?.with_timezone(&Utc);
        Ok(ComplianceViolation {
            id: parse_uuid(&row.id)?,
            drone_id: row.drone_id.as_deref().map(parse_uuid).transpose()?,
            pilot_id: row.pilot_id.as_deref().map(parse_uuid).transpose()?,
            organization_id: row.organization_id.as_deref().map(parse_uuid).transpose()?,
            flight_plan_id: row.flight_plan_id.as_deref().map(parse_uuid).transpose()?,
            violation_type,
            severity,
            description: row.description,
            evidence: serde_json::from_str(&row.evidence)?,
            status,
            detected_by: row.detected_by,
            created_at,
        })
    }
}
