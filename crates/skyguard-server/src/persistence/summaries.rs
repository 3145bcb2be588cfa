//! Flight summary persistence. Write-once per flight plan.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use skyguard_core::models::FlightLogSummary;

use super::registry::parse_uuid;

/// Insert a summary if none exists for the plan yet. Returns false when a
/// summary was already written; the existing row is left untouched.
pub async fn insert_summary(pool: &SqlitePool, summary: &FlightLogSummary) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO flight_log_summaries (
            flight_plan_id, drone_id, takeoff_time, landing_time,
            total_flight_duration_sec, total_distance_km,
            max_altitude_m, avg_altitude_m, max_speed_mps, avg_speed_mps,
            battery_start_percentage, battery_end_percentage,
            altitude_violations, total_log_entries,
            first_entry_hash, last_entry_hash, chain_verified
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#,
    )
    .bind(summary.flight_plan_id.to_string())
    .bind(summary.drone_id.to_string())
    .bind(summary.takeoff_time.to_rfc3339())
    .bind(summary.landing_time.to_rfc3339())
    .bind(summary.total_flight_duration_sec)
    .bind(summary.total_distance_km)
    .bind(summary.max_altitude_m)
    .bind(summary.avg_altitude_m)
    .bind(summary.max_speed_mps)
    .bind(summary.avg_speed_mps)
    .bind(summary.battery_start_percentage)
    .bind(summary.battery_end_percentage)
    .bind(summary.altitude_violations)
    .bind(summary.total_log_entries)
    .bind(&summary.first_entry_hash)
    .bind(&summary.last_entry_hash)
    .bind(summary.chain_verified)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn load_summary(
    pool: &SqlitePool,
    flight_plan_id: Uuid,
) -> Result<Option<FlightLogSummary>> {
    let row = sqlx::query_as::<_, SummaryRow>(
        "SELECT flight_plan_id, drone_id, takeoff_time, landing_time, total_flight_duration_sec, total_distance_km, max_altitude_m, avg_altitude_m, max_speed_mps, avg_speed_mps, battery_start_percentage, battery_end_percentage, altitude_violations, total_log_entries, first_entry_hash, last_entry_hash, chain_verified FROM flight_log_summaries WHERE flight_plan_id = ?1"
    )
    .bind(flight_plan_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    flight_plan_id: String,
    drone_id: String,
    takeoff_time: String,
    landing_time: String,
    total_flight_duration_sec: i64,
    total_distance_km: f64,
    max_altitude_m: Option<f64>,
    avg_altitude_m: Option<f64>,
    max_speed_mps: Option<f64>,
    avg_speed_mps: Option<f64>,
    battery_start_percentage: Option<i32>,
    battery_end_percentage: Option<i32>,
    altitude_violations: i64,
    total_log_entries: i64,
    first_entry_hash: Option<String>,
    last_entry_hash: Option<String>,
    chain_verified: bool,
}

impl TryFrom<SummaryRow> for FlightLogSummary {
    type Error = anyhow::Error;

    fn try_from(row: SummaryRow) -> Result<Self> {
        let takeoff_time: DateTime<Utc> =
            DateTime::parse_from_rfc3339(&row.takeoff_time)?.with_timezone(&Utc);
        let landing_time: DateTime<Utc> =
            DateTime::parse_from_rfc3339(&row.landing_time)?.with_timezone(&Utc);
        Ok(FlightLogSummary {
            flight_plan_id: parse_uuid(&row.flight_plan_id)?,
            drone_id: parse_uuid(&row.drone_id)?,
            takeoff_time,
            landing_time,
            total_flight_duration_sec: row.total_flight_duration_sec,
            total_distance_km: row.total_distance_km,
            max_altitude_m: row.max_altitude_m,
            avg_altitude_m: row.avg_altitude_m,
            max_speed_mps: row.max_speed_mps,
            avg_speed_mps: row.avg_speed_mps,
            battery_start_percentage: row.battery_start_percentage,
            battery_end_percentage: row.battery_end_percentage,
            altitude_violations: row.altitude_violations,
            total_log_entries: row.total_log_entries,
            first_entry_hash: row.first_entry_hash,
            last_entry_hash: row.last_entry_hash,
            chain_verified: row.chain_verified,
        })
    }
}
