//! R-tree indexed reference track for nearest-point distance queries.

use crate::error::{Result, TrackCompareError};
use crate::geo_utils::{haversine_distance, to_unit_vector};
use crate::TrackPoint;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A reference point with its index for R-tree queries.
///
/// Stored as a unit-sphere vector so that the R-tree's Euclidean metric
/// orders neighbors the same way great-circle distance does.
#[derive(Debug, Clone, Copy)]
pub struct IndexedPoint {
    pub idx: usize,
    pub xyz: [f64; 3],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xyz)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.xyz[0] - point[0];
        let dy = self.xyz[1] - point[1];
        let dz = self.xyz[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Nearest reference point for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Index of the nearest point in the reference sequence
    pub index: usize,
    /// Great-circle distance to it in meters
    pub distance_meters: f64,
}

/// Nearest-point index over one track, valid for a single analysis call.
pub struct ProximityIndex<'a> {
    reference: &'a [TrackPoint],
    tree: RTree<IndexedPoint>,
}

impl<'a> ProximityIndex<'a> {
    /// Build an index over a non-empty reference sequence.
    ///
    /// Errors name the track `"reference"`; use [`ProximityIndex::build_named`]
    /// when the caller knows which track is being indexed.
    pub fn build(reference: &'a [TrackPoint]) -> Result<Self> {
        Self::build_named("reference", reference)
    }

    /// Build an index over a named track's points.
    pub fn build_named(track_name: &str, reference: &'a [TrackPoint]) -> Result<Self> {
        if reference.is_empty() {
            return Err(TrackCompareError::EmptyTrack {
                track: track_name.to_string(),
            });
        }
        if let Some((index, p)) = reference.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(TrackCompareError::InvalidCoordinates {
                track: track_name.to_string(),
                index,
                latitude: p.latitude,
                longitude: p.longitude,
            });
        }

        let indexed: Vec<IndexedPoint> = reference
            .iter()
            .enumerate()
            .map(|(idx, p)| IndexedPoint {
                idx,
                xyz: to_unit_vector(p),
            })
            .collect();

        Ok(Self {
            reference,
            tree: RTree::bulk_load(indexed),
        })
    }

    /// Number of reference points.
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    /// Always false: building over an empty sequence fails.
    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    /// Nearest reference point to `point`.
    pub fn nearest(&self, point: &TrackPoint) -> Nearest {
        match self.tree.nearest_neighbor(&to_unit_vector(point)) {
            Some(found) => Nearest {
                index: found.idx,
                distance_meters: haversine_distance(point, &self.reference[found.idx]),
            },
            // Unreachable for a built index; fall back to the linear scan
            None => nearest_linear(point, self.reference),
        }
    }

    /// Minimum great-circle distance in meters from `point` to the reference track.
    pub fn nearest_distance(&self, point: &TrackPoint) -> f64 {
        self.nearest(point).distance_meters
    }
}

/// Brute-force nearest point by scanning the whole reference sequence.
///
/// Same semantics as [`ProximityIndex::nearest`]; returns an infinite
/// distance for an empty reference.
pub fn nearest_linear(point: &TrackPoint, reference: &[TrackPoint]) -> Nearest {
    reference
        .iter()
        .enumerate()
        .map(|(index, p)| Nearest {
            index,
            distance_meters: haversine_distance(point, p),
        })
        .fold(
            Nearest {
                index: 0,
                distance_meters: f64::INFINITY,
            },
            |best, candidate| {
                if candidate.distance_meters < best.distance_meters {
                    candidate
                } else {
                    best
                }
            },
        )
}

/// Minimum distance from `point` to any point in `reference` by linear scan.
pub fn min_distance_linear(point: &TrackPoint, reference: &[TrackPoint]) -> f64 {
    nearest_linear(point, reference).distance_meters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zurich_line() -> Vec<TrackPoint> {
        (0..50)
            .map(|i| TrackPoint::new(47.37 + i as f64 * 0.0005, 8.54 + i as f64 * 0.0003))
            .collect()
    }

    #[test]
    fn test_build_empty_fails() {
        let result = ProximityIndex::build(&[]);
        assert!(matches!(result, Err(TrackCompareError::EmptyTrack { .. })));
    }

    #[test]
    fn test_build_invalid_coordinates_fails() {
        let points = vec![TrackPoint::new(47.0, 8.0), TrackPoint::new(95.0, 8.0)];
        let result = ProximityIndex::build(&points);
        assert!(matches!(
            result,
            Err(TrackCompareError::InvalidCoordinates { index: 1, .. })
        ));
    }

    #[test]
    fn test_build_named_reports_track() {
        let err = ProximityIndex::build_named("Evening_Ride", &[])
            .err()
            .unwrap();
        assert_eq!(
            err,
            TrackCompareError::EmptyTrack {
                track: "Evening_Ride".to_string()
            }
        );

        let points = vec![TrackPoint::new(47.0, 8.0), TrackPoint::new(47.0, 200.0)];
        let err = ProximityIndex::build_named("Evening_Ride", &points)
            .err()
            .unwrap();
        match err {
            TrackCompareError::InvalidCoordinates { track, index, .. } => {
                assert_eq!(track, "Evening_Ride");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_point_on_track_has_zero_distance() {
        let reference = zurich_line();
        let index = ProximityIndex::build(&reference).unwrap();
        let nearest = index.nearest(&reference[17]);
        assert_eq!(nearest.index, 17);
        assert_eq!(nearest.distance_meters, 0.0);
    }

    #[test]
    fn test_matches_linear_scan() {
        let reference = zurich_line();
        let index = ProximityIndex::build(&reference).unwrap();

        let queries = [
            TrackPoint::new(47.3712, 8.5411),
            TrackPoint::new(47.3801, 8.5499),
            TrackPoint::new(47.36, 8.53),
            TrackPoint::new(47.40, 8.56),
        ];
        for q in &queries {
            let indexed = index.nearest_distance(q);
            let linear = min_distance_linear(q, &reference);
            assert!(
                (indexed - linear).abs() < 1e-6,
                "indexed {} vs linear {}",
                indexed,
                linear
            );
        }
    }

    #[test]
    fn test_single_point_reference() {
        let reference = vec![TrackPoint::new(51.5074, -0.1278)];
        let index = ProximityIndex::build(&reference).unwrap();
        let paris = TrackPoint::new(48.8566, 2.3522);
        assert_eq!(index.len(), 1);
        assert!(index.nearest_distance(&paris) > 300_000.0);
    }

    #[test]
    fn test_across_antimeridian() {
        // Points on either side of 180 degrees are close on the sphere
        let reference = vec![TrackPoint::new(0.0, 179.9999)];
        let index = ProximityIndex::build(&reference).unwrap();
        let query = TrackPoint::new(0.0, -179.9999);
        assert!(index.nearest_distance(&query) < 30.0);
    }

    #[test]
    fn test_linear_empty_reference() {
        let q = TrackPoint::new(0.0, 0.0);
        assert!(min_distance_linear(&q, &[]).is_infinite());
    }
}
