//! Unified error handling for the track-compare library.
//!
//! Every fallible operation returns [`Result`]. Input problems (empty tracks,
//! bad thresholds, out-of-range coordinates) are reported before any
//! computation starts and are never retried.

use std::fmt;

/// Unified error type for track-compare operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackCompareError {
    /// Track has no points
    EmptyTrack { track: String },
    /// Overlap threshold is zero, negative or not finite
    InvalidThreshold { threshold: f64 },
    /// A point has coordinates outside the valid lat/lng range
    InvalidCoordinates {
        track: String,
        index: usize,
        latitude: f64,
        longitude: f64,
    },
    /// Classification sequence does not line up with the track's points
    ClassificationMismatch {
        point_count: usize,
        classification_count: usize,
    },
    /// GPX document could not be parsed
    GpxParse { message: String },
    /// File could not be read
    Io { message: String },
    /// Comparison chart could not be drawn or written
    Chart { message: String },
}

impl TrackCompareError {
    /// True for errors caused by malformed caller input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            TrackCompareError::EmptyTrack { .. }
                | TrackCompareError::InvalidThreshold { .. }
                | TrackCompareError::InvalidCoordinates { .. }
                | TrackCompareError::ClassificationMismatch { .. }
        )
    }
}

impl fmt::Display for TrackCompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackCompareError::EmptyTrack { track } => {
                write!(f, "Track '{}' has no points", track)
            }
            TrackCompareError::InvalidThreshold { threshold } => {
                write!(
                    f,
                    "Overlap threshold must be a positive distance, got {}",
                    threshold
                )
            }
            TrackCompareError::InvalidCoordinates {
                track,
                index,
                latitude,
                longitude,
            } => {
                write!(
                    f,
                    "Track '{}' has invalid coordinates at point {}: ({}, {})",
                    track, index, latitude, longitude
                )
            }
            TrackCompareError::ClassificationMismatch {
                point_count,
                classification_count,
            } => {
                write!(
                    f,
                    "Expected {} classifications, got {}",
                    point_count, classification_count
                )
            }
            TrackCompareError::GpxParse { message } => {
                write!(f, "GPX parse error: {}", message)
            }
            TrackCompareError::Io { message } => {
                write!(f, "I/O error: {}", message)
            }
            TrackCompareError::Chart { message } => {
                write!(f, "Chart error: {}", message)
            }
        }
    }
}

impl std::error::Error for TrackCompareError {}

impl From<std::io::Error> for TrackCompareError {
    fn from(err: std::io::Error) -> Self {
        TrackCompareError::Io {
            message: err.to_string(),
        }
    }
}

impl From<gpx::errors::GpxError> for TrackCompareError {
    fn from(err: gpx::errors::GpxError) -> Self {
        TrackCompareError::GpxParse {
            message: err.to_string(),
        }
    }
}

/// Result type alias for track-compare operations.
pub type Result<T> = std::result::Result<T, TrackCompareError>;

/// Extension trait for converting Option to TrackCompareError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an empty track error.
    fn ok_or_empty_track(self, track: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_empty_track(self, track: &str) -> Result<T> {
        self.ok_or_else(|| TrackCompareError::EmptyTrack {
            track: track.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackCompareError::InvalidCoordinates {
            track: "Morning_Ride".to_string(),
            index: 7,
            latitude: 91.0,
            longitude: 0.0,
        };
        assert!(err.to_string().contains("Morning_Ride"));
        assert!(err.to_string().contains("point 7"));
    }

    #[test]
    fn test_invalid_input_category() {
        assert!(TrackCompareError::InvalidThreshold { threshold: 0.0 }.is_invalid_input());
        assert!(TrackCompareError::EmptyTrack {
            track: "a".to_string()
        }
        .is_invalid_input());
        assert!(!TrackCompareError::Io {
            message: "gone".to_string()
        }
        .is_invalid_input());
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_empty_track("test");
        assert!(matches!(result, Err(TrackCompareError::EmptyTrack { .. })));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.gpx");
        let err: TrackCompareError = io.into();
        assert!(matches!(err, TrackCompareError::Io { .. }));
        assert!(err.to_string().contains("missing.gpx"));
    }
}
