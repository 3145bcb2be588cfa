//! Spatial math for zone classification and flight summaries.

use crate::error::GeometryError;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using the Haversine
/// formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Axis-aligned bounding box over [lat, lon] vertices, used as a cheap
/// prefilter before exact containment tests.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn of_ring(ring: &[[f64; 2]]) -> Self {
        let mut bbox = Self {
            min_lat: f64::MAX,
            max_lat: f64::MIN,
            min_lon: f64::MAX,
            max_lon: f64::MIN,
        };
        for v in ring {
            bbox.min_lat = bbox.min_lat.min(v[0]);
            bbox.max_lat = bbox.max_lat.max(v[0]);
            bbox.min_lon = bbox.min_lon.min(v[1]);
            bbox.max_lon = bbox.max_lon.max(v[1]);
        }
        bbox
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
    }
}

/// Check if a point is inside a closed ring using ray casting.
pub fn point_in_ring(lat: f64, lon: f64, ring: &[[f64; 2]]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = ring[i][0];
        let xi = ring[i][1];
        let yj = ring[j][0];
        let xj = ring[j][1];

        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Segment intersection test on (lat, lon) pairs, including touches and
/// collinear overlaps. Tolerance absorbs floating-point error from the
/// orientation arithmetic.
pub fn segments_intersect(a1: [f64; 2], a2: [f64; 2], b1: [f64; 2], b2: [f64; 2]) -> bool {
    const EPS: f64 = 1e-12;

    fn orient(p: [f64; 2], q: [f64; 2], r: [f64; 2]) -> f64 {
        (q[1] - p[1]) * (r[0] - p[0]) - (q[0] - p[0]) * (r[1] - p[1])
    }

    fn within(a: f64, b: f64, value: f64) -> bool {
        let min = a.min(b) - EPS;
        let max = a.max(b) + EPS;
        value >= min && value <= max
    }

    fn on_segment(p: [f64; 2], q: [f64; 2], r: [f64; 2]) -> bool {
        within(p[0], q[0], r[0]) && within(p[1], q[1], r[1])
    }

    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if o1.abs() <= EPS && on_segment(a1, a2, b1) {
        return true;
    }
    if o2.abs() <= EPS && on_segment(a1, a2, b2) {
        return true;
    }
    if o3.abs() <= EPS && on_segment(b1, b2, a1) {
        return true;
    }
    if o4.abs() <= EPS && on_segment(b1, b2, a2) {
        return true;
    }

    let a_crosses = (o1 > EPS && o2 < -EPS) || (o1 < -EPS && o2 > EPS);
    let b_crosses = (o3 > EPS && o4 < -EPS) || (o3 < -EPS && o4 > EPS);
    a_crosses && b_crosses
}

/// Validate a closed, simple polygon ring.
///
/// Rejects rings with fewer than 3 distinct vertices, unclosed rings,
/// out-of-range coordinates, and self-intersections (checked over all
/// non-adjacent edge pairs).
pub fn validate_ring(ring: &[[f64; 2]]) -> Result<(), GeometryError> {
    // A closed triangle needs 4 points (first repeated as last).
    if ring.len() < 4 {
        return Err(GeometryError::TooFewVertices);
    }

    for v in ring {
        let (lat, lon) = (v[0], v[1]);
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GeometryError::CoordinateOutOfRange { lat, lon });
        }
    }

    let first = ring[0];
    let last = ring[ring.len() - 1];
    if (first[0] - last[0]).abs() > 1e-9 || (first[1] - last[1]).abs() > 1e-9 {
        return Err(GeometryError::UnclosedRing);
    }

    // Edges, excluding the duplicated closing vertex.
    let n = ring.len() - 1;
    for i in 0..n {
        for j in (i + 1)..n {
            // Skip adjacent edges (they share a vertex by construction).
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            if segments_intersect(ring[i], ring[i + 1], ring[j], ring[j + 1]) {
                return Err(GeometryError::SelfIntersecting);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<[f64; 2]> {
        vec![
            [33.0, -117.0],
            [33.0, -116.9],
            [33.1, -116.9],
            [33.1, -117.0],
            [33.0, -117.0],
        ]
    }

    #[test]
    fn haversine_known_distance() {
        // ~111km per degree of latitude
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn point_in_ring_inside_and_outside() {
        let ring = square();
        assert!(point_in_ring(33.05, -116.95, &ring));
        assert!(!point_in_ring(33.2, -116.95, &ring));
    }

    #[test]
    fn validate_ring_accepts_square() {
        assert!(validate_ring(&square()).is_ok());
    }

    #[test]
    fn validate_ring_rejects_unclosed() {
        let mut ring = square();
        ring.pop();
        assert_eq!(validate_ring(&ring), Err(GeometryError::UnclosedRing));
    }

    #[test]
    fn validate_ring_rejects_too_few_vertices() {
        let ring = vec![[33.0, -117.0], [33.1, -117.0], [33.0, -117.0]];
        assert_eq!(validate_ring(&ring), Err(GeometryError::TooFewVertices));
    }

    #[test]
    fn validate_ring_rejects_bowtie() {
        // Hourglass: edges (0,1) and (2,3) cross.
        let ring = vec![
            [33.0, -117.0],
            [33.1, -116.9],
            [33.0, -116.9],
            [33.1, -117.0],
            [33.0, -117.0],
        ];
        assert_eq!(validate_ring(&ring), Err(GeometryError::SelfIntersecting));
    }

    #[test]
    fn segments_cross_like_an_x() {
        assert!(segments_intersect(
            [0.0, 0.0],
            [1.0, 1.0],
            [1.0, 0.0],
            [0.0, 1.0]
        ));
        assert!(!segments_intersect(
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0]
        ));
    }
}
