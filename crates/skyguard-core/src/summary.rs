//! Post-flight summary aggregation.
//!
//! A summary is a write-once aggregate computed from a flight's committed
//! log entries after landing. It never feeds back into the chain; it is a
//! reporting artifact derived from it.

use crate::chain::ChainReport;
use crate::models::{FlightLogEntry, FlightLogSummary};
use crate::spatial::haversine_distance;
use uuid::Uuid;

/// Compute the per-flight summary over committed entries.
///
/// Returns `None` for an empty log. Entries are walked in timestamp
/// order; distance is accumulated pairwise with the Haversine formula.
/// `altitude_limit_agl_m` is the AGL ceiling used to count altitude
/// excursions (entries without AGL data are not counted).
pub fn summarize(
    flight_plan_id: Uuid,
    drone_id: Uuid,
    entries: &[FlightLogEntry],
    chain: &ChainReport,
    altitude_limit_agl_m: f64,
) -> Option<FlightLogSummary> {
    if entries.is_empty() {
        return None;
    }

    let mut sorted: Vec<&FlightLogEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.timestamp);

    let takeoff_time = sorted[0].timestamp;
    let landing_time = sorted[sorted.len() - 1].timestamp;
    let duration_sec = (landing_time - takeoff_time).num_seconds();

    let mut total_distance_m = 0.0;
    for pair in sorted.windows(2) {
        total_distance_m += haversine_distance(
            pair[0].latitude,
            pair[0].longitude,
            pair[1].latitude,
            pair[1].longitude,
        );
    }

    let altitudes: Vec<f64> = sorted.iter().map(|e| e.altitude_m).collect();
    let speeds: Vec<f64> = sorted.iter().filter_map(|e| e.ground_speed_mps).collect();
    let batteries: Vec<i32> = sorted.iter().filter_map(|e| e.battery_percentage).collect();

    let altitude_violations = sorted
        .iter()
        .filter_map(|e| e.altitude_agl_m)
        .filter(|agl| *agl > altitude_limit_agl_m)
        .count() as i64;

    Some(FlightLogSummary {
        flight_plan_id,
        drone_id,
        takeoff_time,
        landing_time,
        total_flight_duration_sec: duration_sec,
        total_distance_km: round2(total_distance_m / 1000.0),
        max_altitude_m: max_f64(&altitudes),
        avg_altitude_m: avg_f64(&altitudes).map(round2),
        max_speed_mps: max_f64(&speeds),
        avg_speed_mps: avg_f64(&speeds).map(round2),
        battery_start_percentage: batteries.first().copied(),
        battery_end_percentage: batteries.last().copied(),
        altitude_violations,
        total_log_entries: sorted.len() as i64,
        first_entry_hash: Some(sorted[0].entry_hash.clone()),
        last_entry_hash: Some(sorted[sorted.len() - 1].entry_hash.clone()),
        chain_verified: chain.intact,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn max_f64(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn avg_f64(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{entry_hash, verify_chain, GENESIS_HASH};
    use chrono::{Duration, TimeZone, Utc};

    fn build_entries(n: usize) -> Vec<FlightLogEntry> {
        let drone_id = Uuid::new_v4();
        let flight_id = Uuid::new_v4();
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();

        let mut entries = Vec::with_capacity(n);
        let mut prev = GENESIS_HASH.to_string();
        for i in 0..n {
            let timestamp = start + Duration::seconds(i as i64 * 10);
            let latitude = 28.40 + i as f64 * 0.001;
            let longitude = 76.90;
            let altitude_m = 50.0 + i as f64 * 10.0;
            let seq = i as i64;
            let hash = entry_hash(timestamp, latitude, longitude, altitude_m, seq, &prev);
            entries.push(FlightLogEntry {
                drone_id,
                flight_id,
                timestamp,
                latitude,
                longitude,
                altitude_m,
                altitude_agl_m: Some(altitude_m),
                ground_speed_mps: Some(5.0 + i as f64),
                battery_percentage: Some(100 - i as i32 * 5),
                gps_satellites: Some(12),
                sequence_number: seq,
                previous_hash: prev.clone(),
                entry_hash: hash.clone(),
            });
            prev = hash;
        }
        entries
    }

    #[test]
    fn empty_log_has_no_summary() {
        let chain = verify_chain(&[]);
        assert!(summarize(Uuid::new_v4(), Uuid::new_v4(), &[], &chain, 120.0).is_none());
    }

    #[test]
    fn summary_aggregates_flight_statistics() {
        let entries = build_entries(5);
        let chain = verify_chain(&entries);
        let summary =
            summarize(Uuid::new_v4(), entries[0].drone_id, &entries, &chain, 120.0).unwrap();

        assert_eq!(summary.total_log_entries, 5);
        assert_eq!(summary.total_flight_duration_sec, 40);
        assert_eq!(summary.max_altitude_m, Some(90.0));
        assert_eq!(summary.avg_altitude_m, Some(70.0));
        assert_eq!(summary.max_speed_mps, Some(9.0));
        assert_eq!(summary.avg_speed_mps, Some(7.0));
        assert_eq!(summary.battery_start_percentage, Some(100));
        assert_eq!(summary.battery_end_percentage, Some(80));
        assert_eq!(summary.first_entry_hash.as_deref(), Some(entries[0].entry_hash.as_str()));
        assert_eq!(summary.last_entry_hash.as_deref(), Some(entries[4].entry_hash.as_str()));
        assert!(summary.chain_verified);
        // 4 hops of 0.001 deg latitude, ~111m each.
        assert!((summary.total_distance_km - 0.44).abs() < 0.02);
    }

    #[test]
    fn altitude_excursions_are_counted() {
        let mut entries = build_entries(5);
        entries[3].altitude_agl_m = Some(130.0);
        entries[4].altitude_agl_m = Some(150.0);
        // Keep the chain honest after the edit.
        let chain = ChainReport {
            intact: true,
            anomalies: Vec::new(),
        };
        let summary =
            summarize(Uuid::new_v4(), entries[0].drone_id, &entries, &chain, 120.0).unwrap();
        assert_eq!(summary.altitude_violations, 2);
    }

    #[test]
    fn broken_chain_is_reflected_in_summary() {
        let mut entries = build_entries(4);
        entries[2].altitude_m += 10.0;
        let chain = verify_chain(&entries);
        let summary =
            summarize(Uuid::new_v4(), entries[0].drone_id, &entries, &chain, 120.0).unwrap();
        assert!(!summary.chain_verified);
    }

    #[test]
    fn timestamps_out_of_order_are_sorted() {
        let mut entries = build_entries(3);
        entries.reverse();
        let chain = verify_chain(&entries);
        let summary =
            summarize(Uuid::new_v4(), entries[0].drone_id, &entries, &chain, 120.0).unwrap();
        assert_eq!(summary.total_flight_duration_sec, 20);
        assert_eq!(summary.battery_start_percentage, Some(100));
    }
}
