//! Flight log persistence.
//!
//! This module deliberately exposes only insert and select. There is no
//! update or delete for committed log entries; the hash chain makes any
//! out-of-band edit detectable, and the UNIQUE(flight_id, sequence_number)
//! constraint backstops racing appends.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use skyguard_core::chain::ChainTail;
use skyguard_core::models::FlightLogEntry;

use super::registry::parse_uuid;

/// Append a validated batch inside one transaction. Either every entry
/// commits or none do.
pub async fn append_batch(pool: &SqlitePool, entries: &[FlightLogEntry]) -> Result<()> {
    let mut tx = pool.begin().await?;
    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO flight_logs (
                drone_id, flight_id, timestamp, latitude, longitude,
                altitude_m, altitude_agl_m, ground_speed_mps,
                battery_percentage, gps_satellites,
                sequence_number, previous_hash, entry_hash
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(entry.drone_id.to_string())
        .bind(entry.flight_id.to_string())
        .bind(entry.timestamp.to_rfc3339())
        .bind(entry.latitude)
        .bind(entry.longitude)
        .bind(entry.altitude_m)
        .bind(entry.altitude_agl_m)
        .bind(entry.ground_speed_mps)
        .bind(entry.battery_percentage)
        .bind(entry.gps_satellites)
        .bind(entry.sequence_number)
        .bind(&entry.previous_hash)
        .bind(&entry.entry_hash)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Last committed (sequence, hash) for a flight, read fresh from storage.
pub async fn chain_tail(pool: &SqlitePool, flight_id: Uuid) -> Result<Option<ChainTail>> {
    let row: Option<(i64, String)> = sqlx::query_as(
        "SELECT sequence_number, entry_hash FROM flight_logs WHERE flight_id = ?1 ORDER BY sequence_number DESC LIMIT 1"
    )
    .bind(flight_id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(sequence, hash)| ChainTail { sequence, hash }))
}

pub async fn load_entries(pool: &SqlitePool, flight_id: Uuid) -> Result<Vec<FlightLogEntry>> {
    let rows = sqlx::query_as::<_, FlightLogRow>(
        "SELECT drone_id, flight_id, timestamp, latitude, longitude, altitude_m, altitude_agl_m, ground_speed_mps, battery_percentage, gps_satellites, sequence_number, previous_hash, entry_hash FROM flight_logs WHERE flight_id = ?1 ORDER BY sequence_number"
    )
    .bind(flight_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

#[derive(sqlx::FromRow)]
struct FlightLogRow {
    drone_id: String,
    flight_id: String,
    timestamp: String,
    latitude: f64,
    longitude: f64,
    altitude_m: f64,
    altitude_agl_m: Option<f64>,
    ground_speed_mps: Option<f64>,
    battery_percentage: Option<i32>,
    gps_satellites: Option<i32>,
    sequence_number: i64,
    previous_hash: String,
    entry_hash: String,
}

impl TryFrom<FlightLogRow> for FlightLogEntry {
    type Error = anyhow::Error;

    fn try_from(row: FlightLogRow) -> Result<Self> {
        let timestamp: DateTime<Utc> =
            DateTime::parse_from_rfc3339(&row.timestamp)?.with_timezone(&Utc);
        Ok(FlightLogEntry {
            drone_id: parse_uuid(&row.drone_id)?,
            flight_id: parse_uuid(&row.flight_id)?,
            timestamp,
            latitude: row.latitude,
            longitude: row.longitude,
            altitude_m: row.altitude_m,
            altitude_agl_m: row.altitude_agl_m,
            ground_speed_mps: row.ground_speed_mps,
            battery_percentage: row.battery_percentage,
            gps_satellites: row.gps_satellites,
            sequence_number: row.sequence_number,
            previous_hash: row.previous_hash,
            entry_hash: row.entry_hash,
        })
    }
}
