//! Text and JSON rendering of a track comparison.

use crate::metrics::TrackMetrics;
use crate::overlap::{OverlapResult, SegmentRun, TrackOverlap};
use serde::Serialize;

const RULE_WIDTH: usize = 70;

/// Everything the CLI reports for a pair of tracks, ready for `serde_json`.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub metrics: [TrackMetrics; 2],
    pub overlap: OverlapResult,
    /// Near/far segment runs of each track, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs: Option<[Vec<SegmentRun>; 2]>,
}

impl ComparisonReport {
    pub fn new(first: TrackMetrics, second: TrackMetrics, overlap: OverlapResult) -> Self {
        Self {
            metrics: [first, second],
            overlap,
            runs: None,
        }
    }

    /// Attach the segment runs of the first and second track.
    pub fn with_runs(mut self, first: Vec<SegmentRun>, second: Vec<SegmentRun>) -> Self {
        self.runs = Some([first, second]);
        self
    }

    /// Pretty-printed JSON. Per-point classifications are left out unless
    /// `include_classifications` is set.
    pub fn to_json(&self, include_classifications: bool) -> serde_json::Result<String> {
        if include_classifications {
            return serde_json::to_string_pretty(self);
        }
        let mut trimmed = self.clone();
        trimmed.overlap.first.classifications.clear();
        trimmed.overlap.second.classifications.clear();
        serde_json::to_string_pretty(&trimmed)
    }
}

/// Format seconds as `1h 02m 03s`, `2m 03s` or `3s`. Negative values get a
/// leading minus sign.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 {
        return format!("-{}", format_duration(-seconds));
    }
    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

fn row(label: &str, val1: &str, val2: &str, diff: &str) -> String {
    format!("  {:<24} {:>14} {:>14} {:>14}", label, val1, val2, diff)
}

fn availability(present: bool) -> &'static str {
    if present {
        "available"
    } else {
        "N/A"
    }
}

/// Side-by-side comparison of two tracks' metrics.
pub fn format_metrics_comparison(m1: &TrackMetrics, m2: &TrackMetrics) -> String {
    let mut lines = vec![
        "=".repeat(RULE_WIDTH),
        "TRACK COMPARISON".to_string(),
        "=".repeat(RULE_WIDTH),
        String::new(),
        format!("Track 1: {}", m1.track_name),
        format!("Track 2: {}", m2.track_name),
        String::new(),
        row("Metric", "Track 1", "Track 2", "Difference"),
        "-".repeat(RULE_WIDTH),
    ];

    let (d1, d2) = (m1.total_distance_km(), m2.total_distance_km());
    lines.push(row(
        "Distance",
        &format!("{:.2} km", d1),
        &format!("{:.2} km", d2),
        &format!("{:+.2} km", d1 - d2),
    ));
    lines.push(row(
        "Track points",
        &m1.point_count.to_string(),
        &m2.point_count.to_string(),
        &format!("{:+}", m1.point_count as i64 - m2.point_count as i64),
    ));

    if m1.elevation.is_some() || m2.elevation.is_some() {
        lines.push(String::new());
        lines.push("ELEVATION".to_string());
        lines.push("-".repeat(RULE_WIDTH));

        match (&m1.elevation, &m2.elevation) {
            (Some(e1), Some(e2)) => {
                let meters = [
                    ("Min elevation", e1.min_elevation, e2.min_elevation),
                    ("Max elevation", e1.max_elevation, e2.max_elevation),
                    ("Total ascent", e1.total_ascent, e2.total_ascent),
                    ("Total descent", e1.total_descent, e2.total_descent),
                ];
                for (label, v1, v2) in meters {
                    lines.push(row(
                        label,
                        &format!("{:.0} m", v1),
                        &format!("{:.0} m", v2),
                        &format!("{:+.0} m", v1 - v2),
                    ));
                }
            }
            (e1, e2) => lines.push(row(
                "Elevation data",
                availability(e1.is_some()),
                availability(e2.is_some()),
                "",
            )),
        }
    }

    if m1.speed.is_some() || m2.speed.is_some() {
        lines.push(String::new());
        lines.push("TIMING & SPEED".to_string());
        lines.push("-".repeat(RULE_WIDTH));

        match (&m1.speed, &m2.speed) {
            (Some(s1), Some(s2)) => {
                lines.push(row(
                    "Duration",
                    &format_duration(s1.duration_secs),
                    &format_duration(s2.duration_secs),
                    &format_duration(s1.duration_secs - s2.duration_secs),
                ));
                lines.push(row(
                    "Moving time",
                    &format_duration(s1.moving_time_secs),
                    &format_duration(s2.moving_time_secs),
                    "",
                ));
                let speeds = [
                    ("Avg speed", s1.avg_speed_kmh, s2.avg_speed_kmh),
                    (
                        "Avg moving speed",
                        s1.avg_moving_speed_kmh,
                        s2.avg_moving_speed_kmh,
                    ),
                    ("Max speed", s1.max_speed_kmh, s2.max_speed_kmh),
                ];
                for (label, v1, v2) in speeds {
                    lines.push(row(
                        label,
                        &format!("{:.1} km/h", v1),
                        &format!("{:.1} km/h", v2),
                        &format!("{:+.1} km/h", v1 - v2),
                    ));
                }
            }
            (s1, s2) => lines.push(row(
                "Timing data",
                availability(s1.is_some()),
                availability(s2.is_some()),
                "",
            )),
        }
    }

    lines.push(String::new());
    lines.join("\n")
}

fn overlap_block(lines: &mut Vec<String>, track: &TrackOverlap) {
    lines.push(format!("  {}:", track.track_name));
    lines.push(format!(
        "    Overlapping:  {:.2} km ({:.1}%)",
        track.overlapping_km(),
        track.overlap_percentage
    ));
    lines.push(format!("    Unique:       {:.2} km", track.unique_km()));
    lines.push(String::new());
}

/// Overlap analysis summary for both tracks.
pub fn format_overlap_result(result: &OverlapResult) -> String {
    let mut lines = vec![
        "ROUTE OVERLAP ANALYSIS".to_string(),
        "-".repeat(RULE_WIDTH),
    ];
    overlap_block(&mut lines, &result.first);
    overlap_block(&mut lines, &result.second);
    lines.push(format!(
        "  Approximate shared route: {:.2} km",
        result.shared_km()
    ));
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{ElevationMetrics, SpeedMetrics};

    fn metrics(name: &str, distance: f64, points: usize) -> TrackMetrics {
        TrackMetrics {
            track_name: name.to_string(),
            total_distance: distance,
            point_count: points,
            elevation: None,
            speed: None,
        }
    }

    fn report() -> ComparisonReport {
        ComparisonReport::new(
            metrics("a", 1000.0, 2),
            metrics("b", 1000.0, 2),
            OverlapResult {
                first: overlap("a", 1000.0, 500.0),
                second: overlap("b", 1000.0, 500.0),
                threshold_meters: 50.0,
                shared_distance: 500.0,
            },
        )
    }

    fn overlap(name: &str, total: f64, overlapping: f64) -> TrackOverlap {
        TrackOverlap {
            track_name: name.to_string(),
            total_distance: total,
            overlapping_distance: overlapping,
            unique_distance: total - overlapping,
            overlap_percentage: overlapping / total * 100.0,
            classifications: vec![true, false],
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3.0), "3s");
        assert_eq!(format_duration(123.0), "2m 03s");
        assert_eq!(format_duration(3723.0), "1h 02m 03s");
        assert_eq!(format_duration(-65.0), "-1m 05s");
        assert_eq!(format_duration(0.0), "0s");
    }

    #[test]
    fn test_metrics_comparison_basic() {
        let text = format_metrics_comparison(
            &metrics("Morning_Ride", 13_470.0, 213),
            &metrics("Evening_Ride", 13_370.0, 208),
        );
        assert!(text.contains("Track 1: Morning_Ride"));
        assert!(text.contains("13.47 km"));
        assert!(text.contains("+0.10 km"));
        assert!(text.contains("+5"));
        assert!(!text.contains("ELEVATION"));
        assert!(!text.contains("TIMING"));
    }

    #[test]
    fn test_metrics_comparison_partial_data() {
        let mut m1 = metrics("a", 1000.0, 10);
        m1.elevation = Some(ElevationMetrics {
            min_elevation: 400.0,
            max_elevation: 450.0,
            total_ascent: 60.0,
            total_descent: 55.0,
        });
        let m2 = metrics("b", 900.0, 9);

        let text = format_metrics_comparison(&m1, &m2);
        assert!(text.contains("ELEVATION"));
        assert!(text.contains("available"));
        assert!(text.contains("N/A"));
    }

    #[test]
    fn test_metrics_comparison_speed() {
        let speed = SpeedMetrics {
            duration_secs: 3600.0,
            avg_speed_kmh: 20.0,
            max_speed_kmh: 40.0,
            moving_time_secs: 3000.0,
            avg_moving_speed_kmh: 24.0,
        };
        let mut m1 = metrics("a", 20_000.0, 100);
        let mut m2 = metrics("b", 20_000.0, 100);
        m1.speed = Some(speed.clone());
        m2.speed = Some(SpeedMetrics {
            duration_secs: 3700.0,
            ..speed
        });

        let text = format_metrics_comparison(&m1, &m2);
        assert!(text.contains("TIMING & SPEED"));
        assert!(text.contains("1h 00m 00s"));
        assert!(text.contains("-1m 40s"));
        assert!(text.contains("24.0 km/h"));
    }

    #[test]
    fn test_format_overlap_result() {
        let result = OverlapResult {
            first: overlap("Morning_Ride", 13_470.0, 8_520.0),
            second: overlap("Evening_Ride", 13_370.0, 9_010.0),
            threshold_meters: 50.0,
            shared_distance: 8_766.0,
        };
        let text = format_overlap_result(&result);
        assert!(text.contains("ROUTE OVERLAP ANALYSIS"));
        assert!(text.contains("8.52 km (63.3%)"));
        assert!(text.contains("Unique:       4.95 km"));
        assert!(text.contains("Approximate shared route: 8.77 km"));
    }

    #[test]
    fn test_report_json_trims_classifications() {
        let report = report();

        let compact: serde_json::Value =
            serde_json::from_str(&report.to_json(false).unwrap()).unwrap();
        assert_eq!(compact["overlap"]["first"]["classifications"], serde_json::json!([]));
        assert_eq!(compact["metrics"][0]["track_name"], "a");

        let full: serde_json::Value = serde_json::from_str(&report.to_json(true).unwrap()).unwrap();
        assert_eq!(
            full["overlap"]["second"]["classifications"],
            serde_json::json!([true, false])
        );
    }

    #[test]
    fn test_report_json_runs() {
        let without: serde_json::Value =
            serde_json::from_str(&report().to_json(true).unwrap()).unwrap();
        assert!(without.get("runs").is_none());

        let run = |near: bool| SegmentRun {
            start_index: 0,
            end_index: 1,
            near,
            distance_meters: 500.0,
        };
        let with = report().with_runs(vec![run(true)], vec![run(false)]);
        let json: serde_json::Value = serde_json::from_str(&with.to_json(true).unwrap()).unwrap();
        assert_eq!(json["runs"][0][0]["near"], true);
        assert_eq!(json["runs"][1][0]["near"], false);
        assert_eq!(json["runs"][1][0]["distance_meters"], 500.0);
    }
}
