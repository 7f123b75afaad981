//! Route overlap analysis between two tracks.
//!
//! Each point of a track is classified as *near* when it lies within the
//! overlap threshold of any point of the other track. Consecutive segments
//! are then bucketed by the classification of the point they lead into:
//! segment `(p[i], p[i+1])` counts as overlapping iff `p[i+1]` is near.
//! A segment's distance is never split between buckets.
//!
//! The two directions (A against B, B against A) are independent and use
//! each track's own length as the denominator, so the two percentages
//! generally differ.
//!
//! # Example
//! ```
//! use track_compare::{analyze_overlap, OverlapThreshold, Track, TrackPoint};
//!
//! let points: Vec<TrackPoint> = (0..20)
//!     .map(|i| TrackPoint::new(47.37 + i as f64 * 0.001, 8.54))
//!     .collect();
//! let a = Track::new("a", points.clone());
//! let b = Track::new("b", points);
//!
//! let result = analyze_overlap(&a, &b, OverlapThreshold::default()).unwrap();
//! assert!((result.first.overlap_percentage - 100.0).abs() < 1e-9);
//! ```

use crate::error::{Result, TrackCompareError};
use crate::geo_utils::{haversine_distance, CompensatedSum};
use crate::proximity::ProximityIndex;
use crate::{Track, TrackPoint};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Default overlap threshold in meters.
pub const DEFAULT_THRESHOLD_METERS: f64 = 50.0;

/// Maximum distance (meters) at which a point counts as near the other track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapThreshold(f64);

impl OverlapThreshold {
    /// Create a threshold; fails unless `meters` is finite and > 0.
    pub fn new(meters: f64) -> Result<Self> {
        if meters.is_finite() && meters > 0.0 {
            Ok(Self(meters))
        } else {
            Err(TrackCompareError::InvalidThreshold { threshold: meters })
        }
    }

    /// Threshold in meters.
    pub fn meters(&self) -> f64 {
        self.0
    }
}

impl Default for OverlapThreshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD_METERS)
    }
}

/// A maximal run of consecutive points sharing one classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRun {
    /// Index of the first point in the run
    pub start_index: usize,
    /// Index of the last point in the run (inclusive)
    pub end_index: usize,
    /// Whether the run's points are near the other track
    pub near: bool,
    /// Length of the segments entering this run's points, in meters
    pub distance_meters: f64,
}

impl SegmentRun {
    /// Number of points in the run.
    pub fn point_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// Overlap figures for one track relative to the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackOverlap {
    pub track_name: String,
    /// Full path length in meters
    pub total_distance: f64,
    /// Meters of path near the other track
    pub overlapping_distance: f64,
    /// Meters of path away from the other track
    pub unique_distance: f64,
    /// overlapping / total * 100; 0 for zero-length tracks
    pub overlap_percentage: f64,
    /// Per-point near/far flags, parallel to the track's points
    pub classifications: Vec<bool>,
}

impl TrackOverlap {
    /// Overlapping distance in kilometers.
    pub fn overlapping_km(&self) -> f64 {
        self.overlapping_distance / 1000.0
    }

    /// Unique distance in kilometers.
    pub fn unique_km(&self) -> f64 {
        self.unique_distance / 1000.0
    }
}

/// Result of comparing two tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapResult {
    /// First track measured against the second
    pub first: TrackOverlap,
    /// Second track measured against the first
    pub second: TrackOverlap,
    /// Threshold used, in meters
    pub threshold_meters: f64,
    /// Approximate shared route length: mean of both overlapping distances
    pub shared_distance: f64,
}

impl OverlapResult {
    /// Approximate shared route length in kilometers.
    pub fn shared_km(&self) -> f64 {
        self.shared_distance / 1000.0
    }
}

/// Label every point as near (`true`) or far (`false`) relative to the indexed track.
pub fn classify_points(
    points: &[TrackPoint],
    index: &ProximityIndex<'_>,
    threshold: OverlapThreshold,
) -> Vec<bool> {
    let limit = threshold.meters();
    points
        .iter()
        .map(|p| index.nearest_distance(p) <= limit)
        .collect()
}

/// Split a classification sequence into maximal runs with their distances.
///
/// A run's distance is the sum of the segments entering each of its points;
/// the track's first point enters no segment.
pub fn segment_runs(points: &[TrackPoint], classifications: &[bool]) -> Result<Vec<SegmentRun>> {
    check_lengths(points, classifications)?;

    let mut runs: Vec<SegmentRun> = Vec::new();
    let mut current: Option<(usize, bool, CompensatedSum)> = None;

    for (i, &near) in classifications.iter().enumerate() {
        let entering = if i > 0 {
            haversine_distance(&points[i - 1], &points[i])
        } else {
            0.0
        };

        if let Some((_, _, length)) = current
            .as_mut()
            .filter(|(_, run_near, _)| *run_near == near)
        {
            length.add(entering);
            continue;
        }

        if let Some((start, run_near, length)) = current.take() {
            runs.push(SegmentRun {
                start_index: start,
                end_index: i - 1,
                near: run_near,
                distance_meters: length.value(),
            });
        }
        let mut length = CompensatedSum::default();
        length.add(entering);
        current = Some((i, near, length));
    }

    if let Some((start, run_near, length)) = current {
        runs.push(SegmentRun {
            start_index: start,
            end_index: classifications.len() - 1,
            near: run_near,
            distance_meters: length.value(),
        });
    }

    Ok(runs)
}

/// Aggregate classified points into overlapping and unique distances.
pub fn aggregate_runs(
    track_name: &str,
    points: &[TrackPoint],
    classifications: &[bool],
) -> Result<TrackOverlap> {
    if points.is_empty() {
        return Err(TrackCompareError::EmptyTrack {
            track: track_name.to_string(),
        });
    }
    check_lengths(points, classifications)?;

    let mut total = CompensatedSum::default();
    let mut overlapping = CompensatedSum::default();
    let mut unique = CompensatedSum::default();

    for (i, w) in points.windows(2).enumerate() {
        let segment = haversine_distance(&w[0], &w[1]);
        total.add(segment);
        // Bucket by the endpoint being entered
        if classifications[i + 1] {
            overlapping.add(segment);
        } else {
            unique.add(segment);
        }
    }

    let total_distance = total.value();
    let overlapping_distance = overlapping.value();
    let overlap_percentage = if total_distance > 0.0 {
        (overlapping_distance / total_distance * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    Ok(TrackOverlap {
        track_name: track_name.to_string(),
        total_distance,
        overlapping_distance,
        unique_distance: unique.value(),
        overlap_percentage,
        classifications: classifications.to_vec(),
    })
}

/// Measure `track` against `other`: build an index over `other`, classify, aggregate.
pub fn analyze_direction(
    track: &Track,
    other: &Track,
    threshold: OverlapThreshold,
) -> Result<TrackOverlap> {
    let index = ProximityIndex::build_named(&other.name, &other.points)?;
    let classifications = classify_points(&track.points, &index, threshold);
    let result = aggregate_runs(&track.name, &track.points, &classifications)?;

    debug!(
        "[Overlap] '{}' vs '{}': {}/{} points near, {:.0}m of {:.0}m",
        track.name,
        other.name,
        classifications.iter().filter(|&&near| near).count(),
        classifications.len(),
        result.overlapping_distance,
        result.total_distance
    );

    Ok(result)
}

/// Analyze how much two tracks overlap.
///
/// Both tracks are validated (non-empty, valid coordinates) before any
/// computation. With the `parallel` feature the two directions run
/// concurrently.
pub fn analyze_overlap(
    track_a: &Track,
    track_b: &Track,
    threshold: OverlapThreshold,
) -> Result<OverlapResult> {
    track_a.validate()?;
    track_b.validate()?;

    #[cfg(feature = "parallel")]
    let (first, second) = rayon::join(
        || analyze_direction(track_a, track_b, threshold),
        || analyze_direction(track_b, track_a, threshold),
    );
    #[cfg(not(feature = "parallel"))]
    let (first, second) = (
        analyze_direction(track_a, track_b, threshold),
        analyze_direction(track_b, track_a, threshold),
    );
    let (first, second) = (first?, second?);

    let shared_distance = (first.overlapping_distance + second.overlapping_distance) / 2.0;

    info!(
        "[Overlap] {} {:.1}% / {} {:.1}% at {}m",
        first.track_name,
        first.overlap_percentage,
        second.track_name,
        second.overlap_percentage,
        threshold.meters()
    );

    Ok(OverlapResult {
        first,
        second,
        threshold_meters: threshold.meters(),
        shared_distance,
    })
}

fn check_lengths(points: &[TrackPoint], classifications: &[bool]) -> Result<()> {
    if points.len() != classifications.len() {
        return Err(TrackCompareError::ClassificationMismatch {
            point_count: points.len(),
            classification_count: classifications.len(),
        });
    }
    Ok(())
}
