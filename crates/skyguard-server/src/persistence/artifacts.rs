//! Permission artifact persistence.
//!
//! The `flight_plan_id` UNIQUE constraint enforces one artifact per plan
//! at the storage layer; racing issuance loses on insert rather than
//! creating duplicates.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use skyguard_core::models::{ArtifactStatus, PermissionArtifact};

use super::registry::parse_uuid;

/// Insert failure classification.
#[derive(Debug)]
pub enum InsertArtifactError {
    /// An artifact already exists for this flight plan.
    Duplicate,
    Other(anyhow::Error),
}

pub async fn insert_artifact(
    pool: &SqlitePool,
    artifact: &PermissionArtifact,
) -> Result<(), InsertArtifactError> {
    let result = sqlx::query(
        r#"
        INSERT INTO permission_artifacts (
            id, flight_plan_id, payload_json, signature,
            issued_at, valid_from, valid_until,
            status, used_at, revoked_at, revocation_reason
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(artifact.id.to_string())
    .bind(artifact.flight_plan_id.to_string())
    .bind(&artifact.payload_json)
    .bind(&artifact.signature)
    .bind(artifact.issued_at.to_rfc3339())
    .bind(artifact.valid_from.to_rfc3339())
    .bind(artifact.valid_until.to_rfc3339())
    .bind(format!("{:?}", artifact.status))
    .bind(artifact.used_at.map(|t| t.to_rfc3339()))
    .bind(artifact.revoked_at.map(|t| t.to_rfc3339()))
    .bind(&artifact.revocation_reason)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(InsertArtifactError::Duplicate),
        Err(e) => Err(InsertArtifactError::Other(e.into())),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub async fn load_artifact(pool: &SqlitePool, id: Uuid) -> Result<Option<PermissionArtifact>> {
    let row = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, flight_plan_id, payload_json, signature, issued_at, valid_from, valid_until, status, used_at, revoked_at, revocation_reason FROM permission_artifacts WHERE id = ?1"
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

pub async fn load_artifact_by_plan(
    pool: &SqlitePool,
    flight_plan_id: Uuid,
) -> Result<Option<PermissionArtifact>> {
    let row = sqlx::query_as::<_, ArtifactRow>(
        "SELECT id, flight_plan_id, payload_json, signature, issued_at, valid_from, valid_until, status, used_at, revoked_at, revocation_reason FROM permission_artifacts WHERE flight_plan_id = ?1"
    )
    .bind(flight_plan_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

/// Flip a Valid artifact to Used in one statement. The status predicate
/// makes the transition single-winner: of two racing consumers, exactly
/// one sees a row change. Returns false for the loser.
pub async fn consume_artifact(
    pool: &SqlitePool,
    id: Uuid,
    used_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE permission_artifacts SET status = 'Used', used_at = ?2 WHERE id = ?1 AND status = 'Valid'",
    )
    .bind(id.to_string())
    .bind(used_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Record a lifecycle transition. Only the status columns change; the
/// signed payload is immutable.
pub async fn update_artifact_status(
    pool: &SqlitePool,
    id: Uuid,
    status: ArtifactStatus,
    used_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    revocation_reason: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE permission_artifacts
        SET status = ?2,
            used_at = COALESCE(?3, used_at),
            revoked_at = COALESCE(?4, revoked_at),
            revocation_reason = COALESCE(?5, revocation_reason)
        WHERE id = ?1
        "#,
    )
    .bind(id.to_string())
    .bind(format!("{status:?}"))
    .bind(used_at.map(|t| t.to_rfc3339()))
    .bind(revoked_at.map(|t| t.to_rfc3339()))
    .bind(revocation_reason)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct ArtifactRow {
    id: String,
    flight_plan_id: String,
    payload_json: String,
    signature: String,
    issued_at: String,
    valid_from: String,
    valid_until: String,
    status: String,
    used_at: Option<String>,
    revoked_at: Option<String>,
    revocation_reason: Option<String>,
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

impl TryFrom<ArtifactRow> for PermissionArtifact {
    type Error = anyhow::Error;

    fn try_from(row: ArtifactRow) -> Result<Self> {
        let status = match row.status.as_str() {
            "Valid" => ArtifactStatus::Valid,
            "Used" => ArtifactStatus::Used,
            "Expired" => ArtifactStatus::Expired,
            _ => ArtifactStatus::Revoked,
        };
        Ok(PermissionArtifact {
            id: parse_uuid(&row.id)?,
            flight_plan_id: parse_uuid(&row.flight_plan_id)?,
            payload_json: row.payload_json,
            signature: row.signature,
            issued_at: parse_time(&row.issued_at)?,
            valid_from: parse_time(&row.valid_from)?,
            valid_until: parse_time(&row.valid_until)?,
            status,
            used_at: row.used_at.as_deref().map(parse_time).transpose()?,
            revoked_at: row.revoked_at.as_deref().map(parse_time).transpose()?,
            revocation_reason: row.revocation_reason,
        })
    }
}
