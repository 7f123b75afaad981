//! # Track Compare
//!
//! Compare two recorded GPS tracks and report shared versus unique route
//! segments, alongside distance, elevation and speed summaries.
//!
//! This library provides:
//! - Route overlap analysis (nearest-point proximity on the sphere, per-point
//!   near/far classification, run aggregation)
//! - GPX parsing into [`Track`] values
//! - Per-track metrics: distance, elevation gain, duration and speed
//! - Text and JSON comparison reports
//! - Route, elevation and speed comparison charts (PNG or SVG)
//!
//! ## Features
//!
//! - **`parallel`** - Run both overlap directions concurrently with rayon
//! - **`cli`** - Build the `track-compare-cli` binary (default)
//! - **`charts`** - Comparison charts via plotters (default)
//! - **`chart-fonts`** - Draw text in PNG charts using system fonts
//!
//! ## Quick Start
//!
//! ```rust
//! use track_compare::{analyze_overlap, OverlapThreshold, Track, TrackPoint};
//!
//! let morning = Track::new(
//!     "Morning_Ride",
//!     vec![
//!         TrackPoint::new(51.5074, -0.1278),
//!         TrackPoint::new(51.5080, -0.1290),
//!         TrackPoint::new(51.5090, -0.1300),
//!     ],
//! );
//! let evening = morning.clone();
//!
//! let result = analyze_overlap(&morning, &evening, OverlapThreshold::default()).unwrap();
//! println!(
//!     "Overlap: {:.1}% / {:.1}%",
//!     result.first.overlap_percentage, result.second.overlap_percentage
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::OffsetDateTime;

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackCompareError};

// Geographic utilities (haversine, path length, compensated summation)
pub mod geo_utils;

// Nearest-point index over a reference track
pub mod proximity;
pub use proximity::{Nearest, ProximityIndex};

// Route overlap analysis
pub mod overlap;
pub use overlap::{
    aggregate_runs, analyze_overlap, classify_points, segment_runs, OverlapResult,
    OverlapThreshold, SegmentRun, TrackOverlap,
};

// GPX parsing
pub mod gpx_io;
pub use gpx_io::{parse_gpx_file, parse_gpx_reader};

// Distance, elevation and speed metrics
pub mod metrics;
pub use metrics::{calculate_metrics, ElevationMetrics, SpeedMetrics, TrackMetrics};

// Text and JSON reports
pub mod output;
pub use output::{format_metrics_comparison, format_overlap_result, ComparisonReport};

// Comparison charts
#[cfg(feature = "charts")]
pub mod charts;
#[cfg(feature = "charts")]
pub use charts::render_comparison_chart;

// ============================================================================
// Core Types
// ============================================================================

/// A single recorded position.
///
/// # Example
/// ```
/// use track_compare::TrackPoint;
/// let point = TrackPoint::new(51.5074, -0.1278).with_elevation(35.0);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: Option<f64>,
    pub time: Option<OffsetDateTime>,
}

impl TrackPoint {
    /// Create a point without elevation or timestamp.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            time: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_time(mut self, time: OffsetDateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl From<&TrackPoint> for geo::Point<f64> {
    fn from(p: &TrackPoint) -> Self {
        geo::Point::new(p.longitude, p.latitude)
    }
}

/// A named, ordered sequence of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub points: Vec<TrackPoint>,
    /// File the track was parsed from, if any
    pub source_file: Option<PathBuf>,
}

impl Track {
    pub fn new(name: impl Into<String>, points: Vec<TrackPoint>) -> Self {
        Self {
            name: name.into(),
            points,
            source_file: None,
        }
    }

    pub fn has_elevation(&self) -> bool {
        self.points.iter().any(|p| p.elevation.is_some())
    }

    pub fn has_timestamps(&self) -> bool {
        self.points.iter().any(|p| p.time.is_some())
    }

    /// Total path length in meters.
    pub fn total_distance(&self) -> f64 {
        geo_utils::polyline_length(&self.points)
    }

    /// Check the track is non-empty and every point has valid coordinates.
    pub fn validate(&self) -> Result<()> {
        self.points.first().ok_or_empty_track(&self.name)?;

        match self.points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            Some((index, p)) => Err(TrackCompareError::InvalidCoordinates {
                track: self.name.clone(),
                index,
                latitude: p.latitude,
                longitude: p.longitude,
            }),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
