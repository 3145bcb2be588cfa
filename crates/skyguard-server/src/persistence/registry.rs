//! Registry persistence: drones, pilots, type certificates, maintenance.
//!
//! Registry rows are read by the gate immediately before evaluation, so
//! loads always hit the database rather than a cache.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

use skyguard_core::models::{
    CertificationStatus, Drone, DroneStatus, MaintenanceItem, MaintenanceStatus, Pilot,
    PilotStatus, TypeCertificate, WeightClass,
};

pub async fn upsert_drone(pool: &SqlitePool, drone: &Drone) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO drones (
            id, uin, serial_number, status, type_certificate_id,
            pilot_id, organization_id, insurance_policy_number, insurance_expiry_date
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            uin = ?2, serial_number = ?3, status = ?4, type_certificate_id = ?5,
            pilot_id = ?6, organization_id = ?7,
            insurance_policy_number = ?8, insurance_expiry_date = ?9
        "#,
    )
    .bind(drone.id.to_string())
    .bind(&drone.uin)
    .bind(&drone.serial_number)
    .bind(format!("{:?}", drone.status))
    .bind(drone.type_certificate_id.to_string())
    .bind(drone.pilot_id.map(|id| id.to_string()))
    .bind(drone.organization_id.map(|id| id.to_string()))
    .bind(&drone.insurance_policy_number)
    .bind(drone.insurance_expiry_date.map(|d| d.to_string()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_drone(pool: &SqlitePool, id: Uuid) -> Result<Option<Drone>> {
    let row = sqlx::query_as::<_, DroneRow>(
        "SELECT id, uin, serial_number, status, type_certificate_id, pilot_id, organization_id, insurance_policy_number, insurance_expiry_date FROM drones WHERE id = ?1"
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

pub async fn upsert_pilot(pool: &SqlitePool, pilot: &Pilot) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pilots (id, rpc_number, class_rating, status, expiry_date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            rpc_number = ?2, class_rating = ?3, status = ?4, expiry_date = ?5
        "#,
    )
    .bind(pilot.id.to_string())
    .bind(&pilot.rpc_number)
    .bind(format!("{:?}", pilot.class_rating))
    .bind(format!("{:?}", pilot.status))
    .bind(pilot.expiry_date.map(|d| d.to_string()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_pilot(pool: &SqlitePool, id: Uuid) -> Result<Option<Pilot>> {
    let row = sqlx::query_as::<_, PilotRow>(
        "SELECT id, rpc_number, class_rating, status, expiry_date FROM pilots WHERE id = ?1",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

pub async fn upsert_type_certificate(pool: &SqlitePool, tc: &TypeCertificate) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO type_certificates (
            id, model_name, weight_class, certification_status, npnt_compliant,
            operating_altitude_min_ft, operating_altitude_max_ft, expiry_date
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            model_name = ?2, weight_class = ?3, certification_status = ?4,
            npnt_compliant = ?5, operating_altitude_min_ft = ?6,
            operating_altitude_max_ft = ?7, expiry_date = ?8
        "#,
    )
    .bind(tc.id.to_string())
    .bind(&tc.model_name)
    .bind(format!("{:?}", tc.weight_class))
    .bind(format!("{:?}", tc.certification_status))
    .bind(tc.npnt_compliant)
    .bind(tc.operating_altitude_min_ft)
    .bind(tc.operating_altitude_max_ft)
    .bind(tc.expiry_date.map(|d| d.to_string()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_type_certificate(pool: &SqlitePool, id: Uuid) -> Result<Option<TypeCertificate>> {
    let row = sqlx::query_as::<_, TypeCertificateRow>(
        "SELECT id, model_name, weight_class, certification_status, npnt_compliant, operating_altitude_min_ft, operating_altitude_max_ft, expiry_date FROM type_certificates WHERE id = ?1"
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(r.try_into()?)),
        None => Ok(None),
    }
}

pub async fn upsert_maintenance_item(pool: &SqlitePool, item: &MaintenanceItem) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO maintenance_items (id, drone_id, is_critical, status, description)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            drone_id = ?2, is_critical = ?3, status = ?4, description = ?5
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.drone_id.to_string())
    .bind(item.is_critical)
    .bind(format!("{:?}", item.status))
    .bind(&item.description)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load unresolved maintenance items for a drone.
pub async fn load_open_maintenance(pool: &SqlitePool, drone_id: Uuid) -> Result<Vec<MaintenanceItem>> {
    let rows = sqlx::query_as::<_, MaintenanceRow>(
        "SELECT id, drone_id, is_critical, status, description FROM maintenance_items WHERE drone_id = ?1 AND status NOT IN ('Completed', 'Verified')"
    )
    .bind(drone_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| anyhow!("bad uuid {raw:?}: {e}"))
}

pub(crate) fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| s.parse().ok())
}

fn parse_weight_class(raw: &str) -> WeightClass {
    match raw {
        "Nano" => WeightClass::Nano,
        "Micro" => WeightClass::Micro,
        "Small" => WeightClass::Small,
        "Medium" => WeightClass::Medium,
        _ => WeightClass::Large,
    }
}

#[derive(sqlx::FromRow)]
struct DroneRow {
    id: String,
    uin: Option<String>,
    serial_number: Option<String>,
    status: String,
    type_certificate_id: String,
    pilot_id: Option<String>,
    organization_id: Option<String>,
    insurance_policy_number: Option<String>,
    insurance_expiry_date: Option<String>,
}

impl TryFrom<DroneRow> for Drone {
    type Error = anyhow::Error;

    fn try_from(row: DroneRow) -> Result<Self> {
        let status = match row.status.as_str() {
            "Draft" => DroneStatus::Draft,
            "Registered" => DroneStatus::Registered,
            "Active" => DroneStatus::Active,
            "TransferPending" => DroneStatus::TransferPending,
            "Deregistered" => DroneStatus::Deregistered,
            "Lost" => DroneStatus::Lost,
            _ => DroneStatus::Damaged,
        };
        Ok(Drone {
            id: parse_uuid(&row.id)?,
            uin: row.uin,
            serial_number: row.serial_number,
            status,
            type_certificate_id: parse_uuid(&row.type_certificate_id)?,
            pilot_id: row.pilot_id.as_deref().map(parse_uuid).transpose()?,
            organization_id: row.organization_id.as_deref().map(parse_uuid).transpose()?,
            insurance_policy_number: row.insurance_policy_number,
            insurance_expiry_date: parse_date(row.insurance_expiry_date),
        })
    }
}

#[derive(sqlx::FromRow)]
struct PilotRow {
    id: String,
    rpc_number: Option<String>,
    class_rating: String,
    status: String,
    expiry_date: Option<String>,
}

impl TryFrom<PilotRow> for Pilot {
    type Error = anyhow::Error;

    fn try_from(row: PilotRow) -> Result<Self> {
        let status = match row.status.as_str() {
            "Active" => PilotStatus::Active,
            "Suspended" => PilotStatus::Suspended,
            "Expired" => PilotStatus::Expired,
            _ => PilotStatus::Revoked,
        };
        Ok(Pilot {
            id: parse_uuid(&row.id)?,
            rpc_number: row.rpc_number,
            class_rating: parse_weight_class(&row.class_rating),
            status,
            expiry_date: parse_date(row.expiry_date),
        })
    }
}

#[derive(sqlx::FromRow)]
struct TypeCertificateRow {
    id: String,
    model_name: String,
    weight_class: String,
    certification_status: String,
    npnt_compliant: bool,
    operating_altitude_min_ft: i32,
    operating_altitude_max_ft: i32,
    expiry_date: Option<String>,
}

impl TryFrom<TypeCertificateRow> for TypeCertificate {
    type Error = anyhow::Error;

    fn try_from(row: TypeCertificateRow) -> Result<Self> {
        let certification_status = match row.certification_status.as_str() {
            "Draft" => CertificationStatus::Draft,
            "Submitted" => CertificationStatus::Submitted,
            "Certified" => CertificationStatus::Certified,
            "Suspended" => CertificationStatus::Suspended,
            _ => CertificationStatus::Revoked,
        };
        Ok(TypeCertificate {
            id: parse_uuid(&row.id)?,
            model_name: row.model_name,
            weight_class: parse_weight_class(&row.weight_class),
            certification_status,
            npnt_compliant: row.npnt_compliant,
            operating_altitude_min_ft: row.operating_altitude_min_ft,
            operating_altitude_max_ft: row.operating_altitude_max_ft,
            expiry_date: parse_date(row.expiry_date),
        })
    }
}

#[derive(sqlx::FromRow)]
struct MaintenanceRow {
    id: String,
    drone_id: String,
    is_critical: bool,
    status: String,
    description: Option<String>,
}

impl TryFrom<MaintenanceRow> for MaintenanceItem {
    type Error = anyhow::Error;

    fn try_from(row: MaintenanceRow) -> Result<Self> {
        let status = match row.status.as_str() {
            "Open" => MaintenanceStatus::Open,
            "InProgress" => MaintenanceStatus::InProgress,
            "Completed" => MaintenanceStatus::Completed,
            _ => MaintenanceStatus::Verified,
        };
        Ok(MaintenanceItem {
            id: parse_uuid(&row.id)?,
            drone_id: parse_uuid(&row.drone_id)?,
            is_critical: row.is_critical,
            status,
            description: row.description,
        })
    }
}
