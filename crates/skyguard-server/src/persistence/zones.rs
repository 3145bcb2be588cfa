//! Airspace zone persistence.

use anyhow::Result;
use sqlx::SqlitePool;

use skyguard_core::models::{AirspaceZone, ZoneCategory};

pub async fn upsert_zone(pool: &SqlitePool, zone: &AirspaceZone) -> Result<()> {
    let polygon_json = serde_json::to_string(&zone.polygon)?;

    sqlx::query(
        r#"
        INSERT INTO airspace_zones (id, name, category, polygon, lower_altitude_ft, upper_altitude_ft, active)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            name = ?2, category = ?3, polygon = ?4,
            lower_altitude_ft = ?5, upper_altitude_ft = ?6, active = ?7
        "#,
    )
    .bind(&zone.id)
    .bind(&zone.name)
    .bind(format!("{:?}", zone.category))
    .bind(&polygon_json)
    .bind(zone.lower_altitude_ft)
    .bind(zone.upper_altitude_ft)
    .bind(zone.active)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_all_zones(pool: &SqlitePool) -> Result<Vec<AirspaceZone>> {
    let rows = sqlx::query_as::<_, ZoneRow>(
        "SELECT id, name, category, polygon, lower_altitude_ft, upper_altitude_ft, active FROM airspace_zones"
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

#[derive(sqlx::FromRow)]
struct ZoneRow {
    id: String,
    name: String,
    category: String,
    polygon: String,
    lower_altitude_ft: i32,
    upper_altitude_ft: i32,
    active: bool,
}

impl TryFrom<ZoneRow> for AirspaceZone {
    type Error = anyhow::Error;

    fn try_from(row: ZoneRow) -> Result<Self> {
        let category = match row.category.as_str() {
            "Red" => ZoneCategory::Red,
            "Yellow" => ZoneCategory::Yellow,
            _ => ZoneCategory::Green,
        };
        let polygon: Vec<[f64; 2]> = serde_json::from_str(&row.polygon)?;
        Ok(AirspaceZone {
            id: row.id,
            name: row.name,
            category,
            polygon,
            lower_altitude_ft: row.lower_altitude_ft,
            upper_altitude_ft: row.upper_altitude_ft,
            active: row.active,
        })
    }
}
