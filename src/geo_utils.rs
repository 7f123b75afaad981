//! Geographic utilities: great-circle distance, path length and
//! unit-sphere projection.

use crate::TrackPoint;
use geo::{Distance, Haversine, Point};

/// Mean Earth radius in meters (IUGG), the radius `geo`'s haversine uses.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine great-circle distance between two points in meters.
pub fn haversine_distance(p1: &TrackPoint, p2: &TrackPoint) -> f64 {
    let origin: Point<f64> = p1.into();
    let destination: Point<f64> = p2.into();
    Haversine::distance(origin, destination)
}

/// Total length of a path in meters (sum of consecutive haversine distances).
///
/// Returns 0.0 for paths with fewer than two points.
pub fn polyline_length(points: &[TrackPoint]) -> f64 {
    let mut total = CompensatedSum::default();
    for w in points.windows(2) {
        total.add(haversine_distance(&w[0], &w[1]));
    }
    total.value()
}

/// Cumulative distance in meters at each point, starting at 0.0.
pub fn cumulative_distances(points: &[TrackPoint]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len());
    if points.is_empty() {
        return distances;
    }

    let mut total = CompensatedSum::default();
    distances.push(0.0);
    for w in points.windows(2) {
        total.add(haversine_distance(&w[0], &w[1]));
        distances.push(total.value());
    }
    distances
}

/// Project a point onto the unit sphere as an (x, y, z) vector.
///
/// Euclidean (chord) distance between projected points grows monotonically
/// with great-circle distance, so nearest-neighbor order is preserved.
pub fn to_unit_vector(point: &TrackPoint) -> [f64; 3] {
    let lat = point.latitude.to_radians();
    let lng = point.longitude.to_radians();
    [lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()]
}

/// Neumaier compensated summation.
///
/// Long tracks add thousands of short segments to a running total of many
/// kilometers; compensation keeps the low-order bits of each segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}
