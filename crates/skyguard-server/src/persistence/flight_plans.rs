//! Flight plan persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use skyguard_core::models::{FlightPlan, FlightStatus, ZoneCategory};

use super::registry::parse_uuid;

pub async fn upsert_flight_plan(pool: &SqlitePool, plan: &FlightPlan) -> Result<()> {
    let polygon_json = serde_json::to_string(&plan.polygon)?;
    let status = format!("{:?}", plan.status);
    let zone_status = plan.zone_status.map(|z| format!("{z:?}"));

    sqlx::query(
        r#"
        INSERT INTO flight_plans (
            id, drone_id, pilot_id, organization_id, polygon,
            min_altitude_ft, max_altitude_ft,
            planned_start, planned_end, actual_start, actual_end,
            zone_status, status, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT(id) DO UPDATE SET
            drone_id = ?2, pilot_id = ?3, organization_id = ?4, polygon = ?5,
            min_altitude_ft = ?6, max_altitude_ft = ?7,
            planned_start = ?8, planned_end = ?9, actual_start = ?10, actual_end = ?11,
            zone_status = ?12, status = ?13
        "#,
    )
    .bind(plan.id.to_string())
    .bind(plan.drone_id.to_string())
    .bind(plan.pilot_id.to_string())
    .bind(plan.organization_id.map(|id| id.to_string()))
    .bind(&polygon_json)
    .bind(plan.min_altitude_ft)
    .bind(plan.max_altitude_ft)
    .bind(plan.planned_start.to_rfc3339())
    .bind(plan.planned_end.to_rfc3339())
    .bind(plan.actual_start.map(|t| t.to_rfc3339()))
    .bind(plan.actual_end.map(|t| t.to_rfc3339()))
    .bind(&zone_status)
    .bind(&status)
    .bind(plan.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_flight_plan(pool: &SqlitePool, id: Uuid) -> Result<Option<FlightPlan>> {
    let row = sqlx::query_as::<_, FlightPlanRow>(
        "SELECT id, drone_id, pilot_id, organization_id, polygon, min_altitude_ft, max_altitude_ft, planned_start, planned_end, actual_start, actual_end, zone_status, status, created_at FROM flight_plans WHERE id = ?1"
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

#[derive(sqlx::FromRow)]
struct FlightPlanRow {
    id: String,
    drone_id: String,
    pilot_id: String,
    organization_id: Option<String>,
    polygon: String,
    min_altitude_ft: i32,
    max_altitude_ft: i32,
    planned_start: String,
    planned_end: String,
    actual_start: Option<String>,
    actual_end: Option<String>,
    zone_status: Option<String>,
    status: String,
    created_at: String,
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

impl TryFrom<FlightPlanRow> for FlightPlan {
    type Error = anyhow::Error;

    fn try_from(row: FlightPlanRow) -> Result<Self> {
        let status = match row.status.as_str() {
            "Draft" => FlightStatus::Draft,
            "Submitted" => FlightStatus::Submitted,
            "Approved" => FlightStatus::Approved,
            "Rejected" => FlightStatus::Rejected,
            "InProgress" => FlightStatus::InProgress,
            "Completed" => FlightStatus::Completed,
            _ => FlightStatus::Aborted,
        };
        let zone_status = row.zone_status.as_deref().map(|z| match z {
            "Red" => ZoneCategory::Red,
            "Yellow" => ZoneCategory::Yellow,
            _ => ZoneCategory::Green,
        });
        let polygon: Vec<[f64; 2]> = serde_json::from_str(&row.polygon)?;

        Ok(FlightPlan {
            id: parse_uuid(&row.id)?,
            drone_id: parse_uuid(&row.drone_id)?,
            pilot_id: parse_uuid(&row.pilot_id)?,
            organization_id: row.organization_id.as_deref().map(parse_uuid).transpose()?,
            polygon,
            min_altitude_ft: row.min_altitude_ft,
            max_altitude_ft: row.max_altitude_ft,
            planned_start: parse_time(&row.planned_start)?,
            planned_end: parse_time(&row.planned_end)?,
            actual_start: row.actual_start.as_deref().map(parse_time).transpose()?,
            actual_end: row.actual_end.as_deref().map(parse_time).transpose()?,
            zone_status,
            status,
            created_at: parse_time(&row.created_at)?,
        })
    }
}
