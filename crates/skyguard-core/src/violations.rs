//! Post-flight compliance violation detection.
//!
//! The detector scans a flight's committed log entries against its
//! authorization context and emits at most one violation per type per
//! flight, carrying machine-readable evidence. Detection is read-only
//! over the chain; persisting the violations is the caller's job.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::chain::ChainReport;
use crate::models::{
    ComplianceViolation, FlightLogEntry, FlightPlan, PermissionArtifact, ViolationStatus,
    ViolationType,
};
use crate::spatial::point_in_ring;
use crate::zones::ZoneIndex;

pub const METERS_TO_FEET: f64 = 3.28084;
pub const MIN_GPS_SATELLITES: i32 = 4;
pub const BATTERY_CRITICAL_PCT: i32 = 10;

pub const DETECTOR_NAME: &str = "system";

/// Everything the detector needs for one flight.
pub struct ScanInput<'a> {
    pub plan: &'a FlightPlan,
    /// Artifact consumed for this flight, if one was ever issued.
    pub artifact: Option<&'a PermissionArtifact>,
    pub entries: &'a [FlightLogEntry],
    pub chain: &'a ChainReport,
    pub zones: &'a ZoneIndex,
    /// Ceiling for recorded altitude, feet. Typically the type
    /// certificate maximum plus a configured tolerance.
    pub altitude_ceiling_ft: f64,
    pub now: DateTime<Utc>,
}

/// Scan one flight and return the violations found.
pub fn scan(input: &ScanInput) -> Vec<ComplianceViolation> {
    let mut found = Vec::new();

    if !input.chain.intact {
        found.push(violation(
            input,
            ViolationType::LogIntegrityViolation,
            "flight log hash chain verification failed".to_string(),
            json!({
                "anomalies": input.chain.anomalies,
            }),
        ));
    }

    if let Some(v) = detect_unauthorized(input) {
        found.push(v);
    }

    if let Some(v) = detect_zone_breach(input) {
        found.push(v);
    }
    if let Some(v) = detect_altitude(input) {
        found.push(v);
    }
    if let Some(v) = detect_gps_quality(input) {
        found.push(v);
    }
    if let Some(v) = detect_battery(input) {
        found.push(v);
    }

    found
}

/// The flight must have consumed a permission artifact at takeoff, and
/// that artifact must have covered the whole recorded flight window.
fn detect_unauthorized(input: &ScanInput) -> Option<ComplianceViolation> {
    let (description, evidence) = match input.artifact {
        None => (
            "flight logs recorded without a permission artifact".to_string(),
            json!({
                "flight_plan_id": input.plan.id,
                "entries": input.entries.len(),
            }),
        ),
        Some(a) => {
            let last_seen = input.entries.iter().map(|e| e.timestamp).max();
            if a.used_at.is_none() {
                (
                    "flight started without consuming its permission artifact".to_string(),
                    json!({ "artifact_id": a.id, "artifact_status": a.status }),
                )
            } else if matches!(last_seen, Some(t) if t > a.valid_until) {
                (
                    "permission artifact expired mid-flight".to_string(),
                    json!({
                        "artifact_id": a.id,
                        "valid_until": a.valid_until,
                        "last_entry_at": last_seen,
                    }),
                )
            } else {
                return None;
            }
        }
    };
    Some(violation(
        input,
        ViolationType::UnauthorizedFlight,
        description,
        evidence,
    ))
}

fn detect_zone_breach(input: &ScanInput) -> Option<ComplianceViolation> {
    let mut red_hits = 0usize;
    let mut outside_area = 0usize;
    let mut first_breach: Option<&FlightLogEntry> = None;

    for entry in input.entries {
        let alt_ft = (entry.altitude_m * METERS_TO_FEET).round() as i32;
        let decision = input
            .zones
            .classify_point(entry.latitude, entry.longitude, Some(alt_ft));
        let in_red = decision.zone == crate::models::ZoneCategory::Red;
        let in_area = point_in_ring(entry.latitude, entry.longitude, &input.plan.polygon);
        if in_red {
            red_hits += 1;
        }
        if !in_area {
            outside_area += 1;
        }
        if (in_red || !in_area) && first_breach.is_none() {
            first_breach = Some(entry);
        }
    }

    let breach = first_breach?;
    Some(violation(
        input,
        ViolationType::ZoneBreach,
        "drone left the approved flight area or entered a red zone".to_string(),
        json!({
            "red_zone_entries": red_hits,
            "entries_outside_area": outside_area,
            "first_breach_sequence": breach.sequence_number,
            "first_breach_at": breach.timestamp,
        }),
    ))
}

fn detect_altitude(input: &ScanInput) -> Option<ComplianceViolation> {
    let offenders: Vec<&FlightLogEntry> = input
        .entries
        .iter()
        .filter(|e| e.altitude_m * METERS_TO_FEET > input.altitude_ceiling_ft)
        .collect();
    let worst = offenders
        .iter()
        .copied()
        .reduce(|a, b| if b.altitude_m > a.altitude_m { b } else { a })?;

    Some(violation(
        input,
        ViolationType::AltitudeViolation,
        format!(
            "recorded altitude exceeded the {:.0}ft ceiling",
            input.altitude_ceiling_ft
        ),
        json!({
            "offending_entries": offenders.len(),
            "max_recorded_altitude_ft": worst.altitude_m * METERS_TO_FEET,
            "worst_sequence": worst.sequence_number,
        }),
    ))
}

fn detect_gps_quality(input: &ScanInput) -> Option<ComplianceViolation> {
    let degraded = input
        .entries
        .iter()
        .filter(|e| matches!(e.gps_satellites, Some(n) if n < MIN_GPS_SATELLITES))
        .count();
    if degraded == 0 {
        return None;
    }
    Some(violation(
        input,
        ViolationType::GpsQualityLow,
        "GPS signal quality below minimum satellite count".to_string(),
        json!({
            "degraded_entries": degraded,
            "min_satellites": MIN_GPS_SATELLITES,
        }),
    ))
}

fn detect_battery(input: &ScanInput) -> Option<ComplianceViolation> {
    let critical = input
        .entries
        .iter()
        .filter(|e| matches!(e.battery_percentage, Some(p) if p < BATTERY_CRITICAL_PCT))
        .count();
    if critical == 0 {
        return None;
    }
    Some(violation(
        input,
        ViolationType::BatteryCritical,
        "battery dropped below the critical threshold in flight".to_string(),
        json!({
            "critical_entries": critical,
            "threshold_pct": BATTERY_CRITICAL_PCT,
        }),
    ))
}

fn violation(
    input: &ScanInput,
    violation_type: ViolationType,
    description: String,
    evidence: serde_json::Value,
) -> ComplianceViolation {
    ComplianceViolation {
        id: Uuid::new_v4(),
        drone_id: Some(input.plan.drone_id),
        pilot_id: Some(input.plan.pilot_id),
        organization_id: input.plan.organization_id,
        flight_plan_id: Some(input.plan.id),
        violation_type,
        severity: violation_type.severity(),
        description,
        evidence,
        status: ViolationStatus::Open,
        detected_by: DETECTOR_NAME.to_string(),
        created_at: input.now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{entry_hash, verify_chain, GENESIS_HASH};
    use crate::models::*;
    use chrono::{Duration, TimeZone};

    fn plan() -> FlightPlan {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        FlightPlan {
            id: Uuid::new_v4(),
            drone_id: Uuid::new_v4(),
            pilot_id: Uuid::new_v4(),
            organization_id: None,
            polygon: vec![
                [28.40, 76.90],
                [28.40, 76.95],
                [28.45, 76.95],
                [28.45, 76.90],
                [28.40, 76.90],
            ],
            min_altitude_ft: 0,
            max_altitude_ft: 300,
            planned_start: start,
            planned_end: start + Duration::hours(1),
            actual_start: Some(start),
            actual_end: None,
            zone_status: Some(ZoneCategory::Green),
            status: FlightStatus::InProgress,
            created_at: start,
        }
    }

    fn artifact(plan: &FlightPlan) -> PermissionArtifact {
        PermissionArtifact {
            id: Uuid::new_v4(),
            flight_plan_id: plan.id,
            payload_json: "{}".to_string(),
            signature: String::new(),
            issued_at: plan.created_at,
            valid_from: plan.planned_start,
            valid_until: plan.planned_end,
            status: ArtifactStatus::Used,
            used_at: Some(plan.planned_start),
            revoked_at: None,
            revocation_reason: None,
        }
    }

    fn entries_in_area(plan: &FlightPlan, n: usize) -> Vec<FlightLogEntry> {
        let start = plan.planned_start;
        let mut out = Vec::with_capacity(n);
        let mut prev = GENESIS_HASH.to_string();
        for i in 0..n {
            let timestamp = start + Duration::seconds(i as i64 * 5);
            let latitude = 28.42;
            let longitude = 76.92;
            let altitude_m = 60.0;
            let seq = i as i64;
            let hash = entry_hash(timestamp, latitude, longitude, altitude_m, seq, &prev);
            out.push(FlightLogEntry {
                drone_id: plan.drone_id,
                flight_id: plan.id,
                timestamp,
                latitude,
                longitude,
                altitude_m,
                altitude_agl_m: Some(altitude_m),
                ground_speed_mps: Some(6.0),
                battery_percentage: Some(85),
                gps_satellites: Some(12),
                sequence_number: seq,
                previous_hash: prev.clone(),
                entry_hash: hash.clone(),
            });
            prev = hash;
        }
        out
    }

    fn empty_zones() -> ZoneIndex {
        ZoneIndex::new(Vec::new()).unwrap()
    }

    fn scan_with<'a>(
        plan: &'a FlightPlan,
        artifact: Option<&'a PermissionArtifact>,
        entries: &'a [FlightLogEntry],
        chain: &'a ChainReport,
        zones: &'a ZoneIndex,
    ) -> Vec<ComplianceViolation> {
        scan(&ScanInput {
            plan,
            artifact,
            entries,
            chain,
            zones,
            altitude_ceiling_ft: 400.0,
            now: plan.planned_start + Duration::hours(1),
        })
    }

    fn types(violations: &[ComplianceViolation]) -> Vec<ViolationType> {
        violations.iter().map(|v| v.violation_type).collect()
    }

    #[test]
    fn clean_flight_yields_no_violations() {
        let plan = plan();
        let art = artifact(&plan);
        let entries = entries_in_area(&plan, 6);
        let chain = verify_chain(&entries);
        let zones = empty_zones();
        assert!(scan_with(&plan, Some(&art), &entries, &chain, &zones).is_empty());
    }

    #[test]
    fn tampered_chain_is_critical() {
        let plan = plan();
        let art = artifact(&plan);
        let mut entries = entries_in_area(&plan, 6);
        entries[2].altitude_m += 25.0;
        let chain = verify_chain(&entries);
        let zones = empty_zones();

        let found = scan_with(&plan, Some(&art), &entries, &chain, &zones);
        assert_eq!(types(&found), vec![ViolationType::LogIntegrityViolation]);
        assert_eq!(found[0].severity, ViolationSeverity::Critical);
    }

    #[test]
    fn missing_artifact_is_unauthorized_flight() {
        let plan = plan();
        let entries = entries_in_area(&plan, 3);
        let chain = verify_chain(&entries);
        let zones = empty_zones();

        let found = scan_with(&plan, None, &entries, &chain, &zones);
        assert_eq!(types(&found), vec![ViolationType::UnauthorizedFlight]);
        assert_eq!(found[0].severity, ViolationSeverity::Critical);
    }

    #[test]
    fn unconsumed_artifact_is_unauthorized_flight() {
        let plan = plan();
        let mut art = artifact(&plan);
        art.status = ArtifactStatus::Valid;
        art.used_at = None;
        let entries = entries_in_area(&plan, 3);
        let chain = verify_chain(&entries);
        let zones = empty_zones();

        let found = scan_with(&plan, Some(&art), &entries, &chain, &zones);
        assert_eq!(types(&found), vec![ViolationType::UnauthorizedFlight]);
    }

    #[test]
    fn artifact_expiring_mid_flight_is_unauthorized() {
        let plan = plan();
        let mut art = artifact(&plan);
        art.valid_until = plan.planned_start + Duration::seconds(5);
        let entries = entries_in_area(&plan, 4);
        let chain = verify_chain(&entries);
        let zones = empty_zones();

        let found = scan_with(&plan, Some(&art), &entries, &chain, &zones);
        assert_eq!(types(&found), vec![ViolationType::UnauthorizedFlight]);
        assert_eq!(found[0].evidence["artifact_id"], json!(art.id));
    }

    #[test]
    fn leaving_the_approved_area_is_a_zone_breach() {
        let plan = plan();
        let art = artifact(&plan);
        let mut entries = entries_in_area(&plan, 4);
        // Rebuild entry 3 outside the approved polygon.
        entries[3].latitude = 28.60;
        entries[3].entry_hash = crate::chain::compute_hash(&entries[3]);
        let chain = verify_chain(&entries);
        let zones = empty_zones();

        let found = scan_with(&plan, Some(&art), &entries, &chain, &zones);
        assert_eq!(types(&found), vec![ViolationType::ZoneBreach]);
        assert_eq!(found[0].severity, ViolationSeverity::High);
        assert_eq!(found[0].evidence["first_breach_sequence"], 3);
    }

    #[test]
    fn red_zone_entry_is_a_zone_breach() {
        let plan = plan();
        let art = artifact(&plan);
        let entries = entries_in_area(&plan, 2);
        let chain = verify_chain(&entries);
        // Red zone covering the whole flight area.
        let zones = ZoneIndex::new(vec![AirspaceZone {
            id: "red-1".to_string(),
            name: "red-1".to_string(),
            category: ZoneCategory::Red,
            polygon: vec![
                [28.30, 76.80],
                [28.30, 77.00],
                [28.50, 77.00],
                [28.50, 76.80],
                [28.30, 76.80],
            ],
            lower_altitude_ft: 0,
            upper_altitude_ft: 1000,
            active: true,
        }])
        .unwrap();

        let found = scan_with(&plan, Some(&art), &entries, &chain, &zones);
        assert_eq!(types(&found), vec![ViolationType::ZoneBreach]);
        assert_eq!(found[0].evidence["red_zone_entries"], 2);
    }

    #[test]
    fn altitude_excursion_is_flagged_once() {
        let plan = plan();
        let art = artifact(&plan);
        let mut entries = entries_in_area(&plan, 5);
        for e in entries.iter_mut().skip(3) {
            // 150m is ~492ft, above the 400ft ceiling.
            e.altitude_m = 150.0;
            e.entry_hash = crate::chain::compute_hash(e);
        }
        // Verification would flag the edits; altitude detection is separate.
        let chain = ChainReport {
            intact: true,
            anomalies: Vec::new(),
        };
        let zones = empty_zones();

        let found = scan_with(&plan, Some(&art), &entries, &chain, &zones);
        assert_eq!(types(&found), vec![ViolationType::AltitudeViolation]);
        assert_eq!(found[0].severity, ViolationSeverity::Medium);
        assert_eq!(found[0].evidence["offending_entries"], 2);
    }

    #[test]
    fn degraded_gps_and_low_battery_are_both_reported() {
        let plan = plan();
        let art = artifact(&plan);
        let mut entries = entries_in_area(&plan, 4);
        entries[1].gps_satellites = Some(3);
        entries[1].entry_hash = crate::chain::compute_hash(&entries[1]);
        entries[3].battery_percentage = Some(7);
        entries[3].entry_hash = crate::chain::compute_hash(&entries[3]);
        let chain = ChainReport {
            intact: true,
            anomalies: Vec::new(),
        };
        let zones = empty_zones();

        let found = scan_with(&plan, Some(&art), &entries, &chain, &zones);
        assert_eq!(
            types(&found),
            vec![ViolationType::GpsQualityLow, ViolationType::BatteryCritical]
        );
    }
}
