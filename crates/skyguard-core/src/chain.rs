//! Tamper-evident flight log hash chain.
//!
//! Every entry's hash covers its own fields plus the previous entry's hash,
//! so retroactive modification, deletion, or reordering of committed
//! entries is detectable without trusting the writer. Committed entries are
//! never updated or deleted; the chain as a whole is the unit of integrity.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ChainError;
use crate::models::FlightLogEntry;

/// Predecessor hash for the first entry of a flight.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Compute the SHA-256 hash of an entry's canonical string.
///
/// Canonical form: `timestamp|lat|lon|alt|sequence|previous_hash` with
/// fixed decimal precision, so recomputation is stable regardless of how
/// the floats were parsed or stored.
pub fn entry_hash(
    timestamp: chrono::DateTime<chrono::Utc>,
    latitude: f64,
    longitude: f64,
    altitude_m: f64,
    sequence_number: i64,
    previous_hash: &str,
) -> String {
    let canonical = format!(
        "{}|{:.7}|{:.7}|{:.2}|{}|{}",
        timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        latitude,
        longitude,
        altitude_m,
        sequence_number,
        previous_hash
    );
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Recompute an entry's hash from its recorded fields.
pub fn compute_hash(entry: &FlightLogEntry) -> String {
    entry_hash(
        entry.timestamp,
        entry.latitude,
        entry.longitude,
        entry.altitude_m,
        entry.sequence_number,
        &entry.previous_hash,
    )
}

/// Last committed `(sequence_number, entry_hash)` for a flight, derived
/// from storage on each append rather than held as shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTail {
    pub sequence: i64,
    pub hash: String,
}

/// Check that `entry` is the valid successor of `tail`.
///
/// `None` means no entries are committed yet: the entry must carry
/// sequence 0 and the genesis predecessor. These two checks double as the
/// optimistic-concurrency guard for racing appends.
pub fn expect_next(tail: Option<&ChainTail>, entry: &FlightLogEntry) -> Result<(), ChainError> {
    let (expected_seq, expected_prev) = match tail {
        Some(t) => (t.sequence + 1, t.hash.as_str()),
        None => (0, GENESIS_HASH),
    };

    if entry.sequence_number != expected_seq {
        return Err(ChainError::SequenceMismatch {
            expected: expected_seq,
            got: entry.sequence_number,
        });
    }
    if entry.previous_hash != expected_prev {
        return Err(ChainError::PredecessorMismatch {
            sequence: entry.sequence_number,
        });
    }
    Ok(())
}

/// How a chain anomaly manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyKind {
    /// Hash recomputation over the stored fields does not match the stored
    /// entry hash.
    ModifiedEntry,
    /// Gap in sequence numbers.
    MissingEntry,
    /// Individual hashes recompute correctly but the previous-hash link
    /// does not match the prior entry, indicating reordering or insertion.
    BrokenLink,
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub sequence: i64,
}

/// Result of a chain verification walk.
#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    pub intact: bool,
    pub anomalies: Vec<Anomaly>,
}

/// Verify a full chain from genesis. Entries may arrive in any order;
/// verification walks them by sequence number.
pub fn verify_chain(entries: &[FlightLogEntry]) -> ChainReport {
    verify_chain_from(None, entries)
}

/// Verify a chain suffix starting after a trusted checkpoint, so long
/// flights can be re-checked incrementally from the last known-good
/// sequence instead of re-hashing everything.
pub fn verify_chain_from(checkpoint: Option<&ChainTail>, entries: &[FlightLogEntry]) -> ChainReport {
    let mut sorted: Vec<&FlightLogEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.sequence_number);

    let (mut expected_seq, mut prior_hash) = match checkpoint {
        Some(t) => (t.sequence + 1, t.hash.clone()),
        None => (0, GENESIS_HASH.to_string()),
    };

    let mut anomalies = Vec::new();
    for entry in sorted {
        if entry.sequence_number != expected_seq {
            anomalies.push(Anomaly {
                kind: AnomalyKind::MissingEntry,
                sequence: expected_seq,
            });
            // Resynchronize on the entry actually present so later
            // entries are judged on their own linkage.
            expected_seq = entry.sequence_number;
            prior_hash = entry.previous_hash.clone();
        }

        if compute_hash(entry) != entry.entry_hash {
            anomalies.push(Anomaly {
                kind: AnomalyKind::ModifiedEntry,
                sequence: entry.sequence_number,
            });
        } else if entry.previous_hash != prior_hash {
            anomalies.push(Anomaly {
                kind: AnomalyKind::BrokenLink,
                sequence: entry.sequence_number,
            });
        }

        prior_hash = entry.entry_hash.clone();
        expected_seq = entry.sequence_number + 1;
    }

    ChainReport {
        intact: anomalies.is_empty(),
        anomalies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn build_chain(n: usize) -> Vec<FlightLogEntry> {
        let drone_id = Uuid::new_v4();
        let flight_id = Uuid::new_v4();
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();

        let mut entries = Vec::with_capacity(n);
        let mut prev = GENESIS_HASH.to_string();
        for i in 0..n {
            let timestamp = start + Duration::seconds(i as i64);
            let latitude = 28.40 + i as f64 * 0.0001;
            let longitude = 76.90 + i as f64 * 0.0001;
            let altitude_m = 60.0 + i as f64;
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
                ground_speed_mps: Some(8.0),
                battery_percentage: Some(90 - i as i32),
                gps_satellites: Some(11),
                sequence_number: seq,
                previous_hash: prev.clone(),
                entry_hash: hash.clone(),
            });
            prev = hash;
        }
        entries
    }

    #[test]
    fn valid_chain_is_intact() {
        for n in [1, 2, 5, 50] {
            let report = verify_chain(&build_chain(n));
            assert!(report.intact, "chain of {n} should verify");
            assert!(report.anomalies.is_empty());
        }
    }

    #[test]
    fn empty_chain_is_intact() {
        let report = verify_chain(&[]);
        assert!(report.intact);
    }

    #[test]
    fn mutated_entry_is_flagged_alone() {
        let mut entries = build_chain(5);
        entries[3].altitude_m += 50.0;

        let report = verify_chain(&entries);
        assert!(!report.intact);
        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].kind, AnomalyKind::ModifiedEntry);
        assert_eq!(report.anomalies[0].sequence, 3);
    }

    #[test]
    fn removed_entry_leaves_a_gap() {
        let mut entries = build_chain(5);
        entries.remove(2);

        let report = verify_chain(&entries);
        assert!(!report.intact);
        assert!(report
            .anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::MissingEntry && a.sequence == 2));
    }

    #[test]
    fn relinked_entry_reports_broken_link() {
        // Rebuild entry 2 with a forged predecessor but a self-consistent
        // hash: recomputation passes, linkage does not.
        let mut entries = build_chain(4);
        let forged_prev = entry_hash(
            entries[0].timestamp,
            0.0,
            0.0,
            0.0,
            99,
            GENESIS_HASH,
        );
        entries[2].previous_hash = forged_prev;
        entries[2].entry_hash = compute_hash(&entries[2]);

        let report = verify_chain(&entries);
        assert!(!report.intact);
        assert_eq!(report.anomalies[0].kind, AnomalyKind::BrokenLink);
        assert_eq!(report.anomalies[0].sequence, 2);
    }

    #[test]
    fn expect_next_accepts_the_successor() {
        let entries = build_chain(3);
        let tail = ChainTail {
            sequence: entries[1].sequence_number,
            hash: entries[1].entry_hash.clone(),
        };
        assert!(expect_next(Some(&tail), &entries[2]).is_ok());
        assert!(expect_next(None, &entries[0]).is_ok());
    }

    #[test]
    fn expect_next_rejects_wrong_sequence() {
        let entries = build_chain(3);
        let tail = ChainTail {
            sequence: 0,
            hash: entries[0].entry_hash.clone(),
        };
        let err = expect_next(Some(&tail), &entries[2]).unwrap_err();
        assert_eq!(err, ChainError::SequenceMismatch { expected: 1, got: 2 });

        // Replay of sequence 0 against an empty chain is fine; sequence 1 is not.
        let err = expect_next(None, &entries[1]).unwrap_err();
        assert!(matches!(err, ChainError::SequenceMismatch { expected: 0, .. }));
    }

    #[test]
    fn expect_next_rejects_wrong_predecessor() {
        let entries = build_chain(3);
        let tail = ChainTail {
            sequence: 1,
            hash: "not-the-real-hash".to_string(),
        };
        let err = expect_next(Some(&tail), &entries[2]).unwrap_err();
        assert_eq!(err, ChainError::PredecessorMismatch { sequence: 2 });
    }

    #[test]
    fn verification_restarts_from_checkpoint() {
        let entries = build_chain(10);
        let checkpoint = ChainTail {
            sequence: entries[6].sequence_number,
            hash: entries[6].entry_hash.clone(),
        };
        let report = verify_chain_from(Some(&checkpoint), &entries[7..]);
        assert!(report.intact);
    }
}
