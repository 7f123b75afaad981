//! Per-track metrics: distance, elevation and speed/timing statistics.
//!
//! These are independent aggregations over a single track. Distances are in
//! meters, speeds in km/h, durations in seconds.
//!
//! ## Example
//! ```rust
//! use track_compare::{calculate_metrics, Track, TrackPoint};
//!
//! let track = Track::new(
//!     "hill",
//!     vec![
//!         TrackPoint::new(47.370, 8.54).with_elevation(400.0),
//!         TrackPoint::new(47.371, 8.54).with_elevation(410.0),
//!     ],
//! );
//! let metrics = calculate_metrics(&track);
//! assert_eq!(metrics.elevation.unwrap().total_ascent, 10.0);
//! ```

use crate::geo_utils::{haversine_distance, polyline_length};
use crate::{Track, TrackPoint};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use crate::geo_utils::cumulative_distances;

/// Elevation changes smaller than this (meters) are treated as GPS noise.
pub const ELEVATION_NOISE_THRESHOLD_M: f64 = 2.0;

/// Segments slower than this (km/h) count as stopped.
pub const MIN_MOVING_SPEED_KMH: f64 = 1.0;

/// Segments faster than this (km/h) are discarded as GPS errors.
pub const MAX_PLAUSIBLE_SPEED_KMH: f64 = 200.0;

/// Elevation statistics for a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationMetrics {
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub total_ascent: f64,
    pub total_descent: f64,
}

impl ElevationMetrics {
    pub fn elevation_range(&self) -> f64 {
        self.max_elevation - self.min_elevation
    }
}

/// Speed and timing statistics for a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedMetrics {
    /// First to last timestamp, in seconds
    pub duration_secs: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    /// Time spent on segments at or above the moving speed, in seconds
    pub moving_time_secs: f64,
    pub avg_moving_speed_kmh: f64,
}

/// All computed metrics for a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetrics {
    pub track_name: String,
    /// Total distance in meters
    pub total_distance: f64,
    pub point_count: usize,
    pub elevation: Option<ElevationMetrics>,
    pub speed: Option<SpeedMetrics>,
}

impl TrackMetrics {
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance / 1000.0
    }
}

/// Calculate all metrics for a track.
pub fn calculate_metrics(track: &Track) -> TrackMetrics {
    TrackMetrics {
        track_name: track.name.clone(),
        total_distance: total_distance(&track.points),
        point_count: track.points.len(),
        elevation: elevation_metrics(&track.points),
        speed: speed_metrics(&track.points),
    }
}

/// Total track distance in meters.
pub fn total_distance(points: &[TrackPoint]) -> f64 {
    polyline_length(points)
}

/// Elevation statistics, or `None` when no point carries an elevation.
///
/// Ascent and descent only accumulate changes of at least
/// [`ELEVATION_NOISE_THRESHOLD_M`]; smaller wobbles do not move the reference.
pub fn elevation_metrics(points: &[TrackPoint]) -> Option<ElevationMetrics> {
    let elevations: Vec<f64> = points.iter().filter_map(|p| p.elevation).collect();
    let (&first, rest) = elevations.split_first()?;

    let mut total_ascent = 0.0;
    let mut total_descent = 0.0;
    let mut reference = first;

    for &elevation in rest {
        let diff = elevation - reference;
        if diff.abs() >= ELEVATION_NOISE_THRESHOLD_M {
            if diff > 0.0 {
                total_ascent += diff;
            } else {
                total_descent += -diff;
            }
            reference = elevation;
        }
    }

    Some(ElevationMetrics {
        min_elevation: elevations.iter().copied().fold(f64::INFINITY, f64::min),
        max_elevation: elevations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        total_ascent,
        total_descent,
    })
}

/// Speed and timing statistics, or `None` without at least two timed points
/// spanning a non-zero duration.
pub fn speed_metrics(points: &[TrackPoint]) -> Option<SpeedMetrics> {
    let mut timed: Vec<(&TrackPoint, OffsetDateTime)> = points
        .iter()
        .filter_map(|p| p.time.map(|t| (p, t)))
        .collect();
    if timed.len() < 2 {
        return None;
    }
    timed.sort_by_key(|&(_, t)| t);

    let (_, start) = timed[0];
    let (_, end) = timed[timed.len() - 1];
    let duration_secs = (end - start).as_seconds_f64();
    if duration_secs == 0.0 {
        return None;
    }

    let avg_speed_kmh = kmh(total_distance(points), duration_secs);

    let mut max_speed_kmh: f64 = 0.0;
    let mut moving_time_secs = 0.0;
    let mut moving_distance = 0.0;

    for w in timed.windows(2) {
        let (p1, t1) = w[0];
        let (p2, t2) = w[1];

        let segment_secs = (t2 - t1).as_seconds_f64();
        if segment_secs <= 0.0 {
            continue;
        }

        let segment_distance = haversine_distance(p1, p2);
        let segment_speed = kmh(segment_distance, segment_secs);
        if segment_speed > MAX_PLAUSIBLE_SPEED_KMH {
            continue;
        }

        max_speed_kmh = max_speed_kmh.max(segment_speed);
        if segment_speed >= MIN_MOVING_SPEED_KMH {
            moving_time_secs += segment_secs;
            moving_distance += segment_distance;
        }
    }

    let avg_moving_speed_kmh = if moving_time_secs > 0.0 {
        kmh(moving_distance, moving_time_secs)
    } else {
        0.0
    };

    Some(SpeedMetrics {
        duration_secs,
        avg_speed_kmh,
        max_speed_kmh,
        moving_time_secs,
        avg_moving_speed_kmh,
    })
}

fn kmh(meters: f64, seconds: f64) -> f64 {
    meters / seconds * 3.6
}
