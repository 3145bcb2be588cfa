//! NPNT eligibility gate.
//!
//! Nine independent preconditions evaluated in a fixed order over a
//! read-only snapshot of entity state. All checks always run; every
//! failure is collected so callers can report the complete, actionable
//! reason set instead of the first one hit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    CertificationStatus, Drone, DroneStatus, FlightPlan, MaintenanceItem, MaintenanceStatus,
    Pilot, PilotStatus, TypeCertificate, ZoneCategory,
};
use crate::zones::ZoneDecision;

/// The nine gate checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheckId {
    DroneStatus,
    UinRegistration,
    TypeCertificate,
    PilotRpc,
    Insurance,
    Maintenance,
    ZoneStatus,
    AltitudeLimits,
    PilotRating,
}

pub const GATE_CHECKS: [GateCheckId; 9] = [
    GateCheckId::DroneStatus,
    GateCheckId::UinRegistration,
    GateCheckId::TypeCertificate,
    GateCheckId::PilotRpc,
    GateCheckId::Insurance,
    GateCheckId::Maintenance,
    GateCheckId::ZoneStatus,
    GateCheckId::AltitudeLimits,
    GateCheckId::PilotRating,
];

/// Structured failure for one check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFailure {
    pub check: GateCheckId,
    pub reason: String,
}

/// Gate outcome. `passed` is true iff `failures` is empty; the failure
/// list is the primary output and must not be collapsed away.
#[derive(Debug, Clone, Serialize)]
pub struct GateDecision {
    pub passed: bool,
    pub failures: Vec<CheckFailure>,
}

/// Read-only snapshot the gate evaluates over. Callers fetch current
/// entity state immediately before building this to avoid stale reads.
#[derive(Debug, Clone)]
pub struct GateContext<'a> {
    pub drone: &'a Drone,
    pub pilot: &'a Pilot,
    pub type_certificate: &'a TypeCertificate,
    pub flight_plan: &'a FlightPlan,
    pub open_maintenance: &'a [MaintenanceItem],
    pub zone: &'a ZoneDecision,
    /// Configured floor for planned flight altitude, in feet.
    pub min_altitude_ft: i32,
    pub now: DateTime<Utc>,
}

/// Run all nine checks and collect every failure.
pub fn evaluate(ctx: &GateContext) -> GateDecision {
    let failures: Vec<CheckFailure> = GATE_CHECKS
        .iter()
        .filter_map(|check| check.run(ctx))
        .collect();

    GateDecision {
        passed: failures.is_empty(),
        failures,
    }
}

impl GateCheckId {
    /// Evaluate one check; `None` means it passed.
    pub fn run(&self, ctx: &GateContext) -> Option<CheckFailure> {
        let reason = match self {
            Self::DroneStatus => check_drone_status(ctx),
            Self::UinRegistration => check_uin(ctx),
            Self::TypeCertificate => check_type_certificate(ctx),
            Self::PilotRpc => check_pilot_rpc(ctx),
            Self::Insurance => check_insurance(ctx),
            Self::Maintenance => check_maintenance(ctx),
            Self::ZoneStatus => check_zone(ctx),
            Self::AltitudeLimits => check_altitude(ctx),
            Self::PilotRating => check_pilot_rating(ctx),
        };
        reason.map(|reason| CheckFailure {
            check: *self,
            reason,
        })
    }
}

fn check_drone_status(ctx: &GateContext) -> Option<String> {
    if ctx.drone.status == DroneStatus::Active {
        None
    } else {
        Some(format!(
            "drone status is {:?}, must be Active",
            ctx.drone.status
        ))
    }
}

fn check_uin(ctx: &GateContext) -> Option<String> {
    match ctx.drone.uin.as_deref() {
        Some(uin) if !uin.is_empty() => None,
        _ => Some("drone has no registered UIN".to_string()),
    }
}

fn check_type_certificate(ctx: &GateContext) -> Option<String> {
    let tc = ctx.type_certificate;
    if tc.certification_status != CertificationStatus::Certified {
        return Some(format!(
            "type certificate status is {:?}, must be Certified",
            tc.certification_status
        ));
    }
    if !tc.npnt_compliant {
        return Some("drone model is not NPNT compliant".to_string());
    }
    if let Some(expiry) = tc.expiry_date {
        if expiry < ctx.now.date_naive() {
            return Some(format!("type certificate expired on {expiry}"));
        }
    }
    None
}

fn check_pilot_rpc(ctx: &GateContext) -> Option<String> {
    let pilot = ctx.pilot;
    if pilot.status != PilotStatus::Active {
        return Some(format!("pilot RPC status is {:?}", pilot.status));
    }
    match pilot.rpc_number.as_deref() {
        Some(rpc) if !rpc.is_empty() => {}
        _ => return Some("pilot has no RPC number".to_string()),
    }
    if let Some(expiry) = pilot.expiry_date {
        if expiry < ctx.now.date_naive() {
            return Some(format!("pilot RPC expired on {expiry}"));
        }
    }
    None
}

fn check_insurance(ctx: &GateContext) -> Option<String> {
    let drone = ctx.drone;
    if drone.insurance_policy_number.is_none() {
        return Some("drone has no insurance policy".to_string());
    }
    match drone.insurance_expiry_date {
        Some(expiry) if expiry >= ctx.now.date_naive() => None,
        Some(expiry) => Some(format!("insurance expired on {expiry}")),
        None => Some("insurance has no expiry date on record".to_string()),
    }
}

fn check_maintenance(ctx: &GateContext) -> Option<String> {
    let blocking = ctx
        .open_maintenance
        .iter()
        .filter(|item| item.is_critical && item.status != MaintenanceStatus::Completed)
        .filter(|item| item.status != MaintenanceStatus::Verified)
        .count();
    if blocking > 0 {
        Some(format!("{blocking} open critical maintenance item(s)"))
    } else {
        None
    }
}

fn check_zone(ctx: &GateContext) -> Option<String> {
    if ctx.zone.zone == ZoneCategory::Red {
        Some(format!(
            "flight area touches red zone(s): {}",
            ctx.zone.touched_zone_ids.join(", ")
        ))
    } else {
        None
    }
}

fn check_altitude(ctx: &GateContext) -> Option<String> {
    let plan = ctx.flight_plan;
    let ceiling = ctx.type_certificate.operating_altitude_max_ft;
    if plan.max_altitude_ft > ceiling {
        return Some(format!(
            "planned altitude {}ft exceeds type certificate limit {}ft",
            plan.max_altitude_ft, ceiling
        ));
    }
    if plan.max_altitude_ft < ctx.min_altitude_ft {
        return Some(format!(
            "planned altitude {}ft is below the configured minimum {}ft",
            plan.max_altitude_ft, ctx.min_altitude_ft
        ));
    }
    None
}

fn check_pilot_rating(ctx: &GateContext) -> Option<String> {
    let rating = ctx.pilot.class_rating;
    let class = ctx.type_certificate.weight_class;
    if rating < class {
        Some(format!(
            "pilot rated for {rating:?} cannot fly a {class:?} class drone"
        ))
    } else {
        None
    }
}
