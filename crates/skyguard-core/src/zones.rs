//! Airspace zone classification.
//!
//! Maps a point or flight polygon to the most restrictive zone it touches
//! (Red dominates Yellow dominates Green). Classification is side-effect
//! free and safe to run concurrently.

use serde::Serialize;

use crate::error::GeometryError;
use crate::models::{AirspaceZone, ZoneCategory};
use crate::spatial::{point_in_ring, segments_intersect, validate_ring, BoundingBox};

/// Result of a zone lookup.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneDecision {
    pub zone: ZoneCategory,
    pub touched_zone_ids: Vec<String>,
}

impl ZoneDecision {
    fn clear() -> Self {
        Self {
            zone: ZoneCategory::Green,
            touched_zone_ids: Vec::new(),
        }
    }
}

/// Spatial index over the maintained zone dataset.
///
/// Each zone carries a precomputed bounding box used as a prefilter so
/// lookups stay sub-linear in practice; exact ray-casting and edge
/// intersection tests run only against candidates.
#[derive(Default)]
pub struct ZoneIndex {
    zones: Vec<(AirspaceZone, BoundingBox)>,
}

impl ZoneIndex {
    /// Build an index, validating every zone polygon up front.
    pub fn new(zones: Vec<AirspaceZone>) -> Result<Self, GeometryError> {
        let mut indexed = Vec::with_capacity(zones.len());
        for zone in zones {
            validate_ring(&zone.polygon)?;
            let bbox = BoundingBox::of_ring(&zone.polygon);
            indexed.push((zone, bbox));
        }
        Ok(Self { zones: indexed })
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Classify a single point at an optional altitude band (feet).
    pub fn classify_point(&self, lat: f64, lon: f64, altitude_ft: Option<i32>) -> ZoneDecision {
        let mut decision = ZoneDecision::clear();
        for (zone, bbox) in &self.zones {
            if !zone.active || !bbox.contains(lat, lon) {
                continue;
            }
            if let Some(alt) = altitude_ft {
                if alt < zone.lower_altitude_ft || alt > zone.upper_altitude_ft {
                    continue;
                }
            }
            if point_in_ring(lat, lon, &zone.polygon) {
                touch(&mut decision, zone);
            }
        }
        decision
    }

    /// Classify a flight polygon over an altitude band (feet).
    ///
    /// A zone is touched if the flight ring enters it in any way: a flight
    /// vertex inside the zone, a zone vertex inside the flight ring, or any
    /// pair of edges crossing.
    pub fn classify_polygon(
        &self,
        ring: &[[f64; 2]],
        min_altitude_ft: i32,
        max_altitude_ft: i32,
    ) -> Result<ZoneDecision, GeometryError> {
        validate_ring(ring)?;
        let flight_bbox = BoundingBox::of_ring(ring);

        let mut decision = ZoneDecision::clear();
        for (zone, bbox) in &self.zones {
            if !zone.active || !bbox.intersects(&flight_bbox) {
                continue;
            }
            if max_altitude_ft < zone.lower_altitude_ft || min_altitude_ft > zone.upper_altitude_ft
            {
                continue;
            }
            if rings_touch(ring, &zone.polygon) {
                touch(&mut decision, zone);
            }
        }
        Ok(decision)
    }
}

fn touch(decision: &mut ZoneDecision, zone: &AirspaceZone) {
    decision.touched_zone_ids.push(zone.id.clone());
    if zone.category > decision.zone {
        decision.zone = zone.category;
    }
}

fn rings_touch(a: &[[f64; 2]], b: &[[f64; 2]]) -> bool {
    if a.iter().any(|v| point_in_ring(v[0], v[1], b)) {
        return true;
    }
    if b.iter().any(|v| point_in_ring(v[0], v[1], a)) {
        return true;
    }
    for i in 0..a.len().saturating_sub(1) {
        for j in 0..b.len().saturating_sub(1) {
            if segments_intersect(a[i], a[i + 1], b[j], b[j + 1]) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: &str, category: ZoneCategory, ring: Vec<[f64; 2]>) -> AirspaceZone {
        AirspaceZone {
            id: id.to_string(),
            name: id.to_string(),
            category,
            polygon: ring,
            lower_altitude_ft: 0,
            upper_altitude_ft: 400,
            active: true,
        }
    }

    fn square(lat: f64, lon: f64, size: f64) -> Vec<[f64; 2]> {
        vec![
            [lat, lon],
            [lat, lon + size],
            [lat + size, lon + size],
            [lat + size, lon],
            [lat, lon],
        ]
    }

    fn index() -> ZoneIndex {
        ZoneIndex::new(vec![
            zone("red-airport", ZoneCategory::Red, square(28.5, 77.0, 0.1)),
            zone("yellow-city", ZoneCategory::Yellow, square(28.3, 77.0, 0.1)),
        ])
        .unwrap()
    }

    #[test]
    fn point_outside_all_zones_is_green() {
        let decision = index().classify_point(20.0, 75.0, Some(200));
        assert_eq!(decision.zone, ZoneCategory::Green);
        assert!(decision.touched_zone_ids.is_empty());
    }

    #[test]
    fn point_in_red_zone() {
        let decision = index().classify_point(28.55, 77.05, Some(200));
        assert_eq!(decision.zone, ZoneCategory::Red);
        assert_eq!(decision.touched_zone_ids, vec!["red-airport".to_string()]);
    }

    #[test]
    fn altitude_band_excludes_zone() {
        // Zone band is 0-400ft; a lookup at 500ft is above it.
        let decision = index().classify_point(28.55, 77.05, Some(500));
        assert_eq!(decision.zone, ZoneCategory::Green);
    }

    #[test]
    fn polygon_crossing_yellow_dominates_green() {
        // Flight square overlapping the yellow zone's west edge.
        let flight = square(28.32, 76.95, 0.08);
        let decision = index().classify_polygon(&flight, 0, 200).unwrap();
        assert_eq!(decision.zone, ZoneCategory::Yellow);
        assert_eq!(decision.touched_zone_ids, vec!["yellow-city".to_string()]);
    }

    #[test]
    fn polygon_touching_red_and_yellow_reports_red() {
        // Tall, thin flight strip spanning both zones.
        let flight = vec![
            [28.32, 77.04],
            [28.32, 77.06],
            [28.56, 77.06],
            [28.56, 77.04],
            [28.32, 77.04],
        ];
        let decision = index().classify_polygon(&flight, 0, 200).unwrap();
        assert_eq!(decision.zone, ZoneCategory::Red);
        assert_eq!(decision.touched_zone_ids.len(), 2);
    }

    #[test]
    fn polygon_fully_containing_zone_is_touched() {
        let flight = square(28.45, 76.95, 0.3);
        let decision = index().classify_polygon(&flight, 0, 200).unwrap();
        assert_eq!(decision.zone, ZoneCategory::Red);
    }

    #[test]
    fn invalid_flight_polygon_is_rejected() {
        let open_ring = vec![[28.0, 77.0], [28.1, 77.0], [28.1, 77.1], [28.0, 77.1]];
        let err = index().classify_polygon(&open_ring, 0, 200).unwrap_err();
        assert_eq!(err, GeometryError::UnclosedRing);
    }

    #[test]
    fn invalid_zone_polygon_fails_index_build() {
        let bad = zone(
            "bad",
            ZoneCategory::Red,
            vec![[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]],
        );
        assert!(ZoneIndex::new(vec![bad]).is_err());
    }
}
