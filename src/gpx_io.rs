//! GPX parsing into [`Track`] values.
//!
//! Points are collected from every track segment and then from every route,
//! in document order. The track takes the last non-empty `<trk>` or `<rte>`
//! name it encounters, falling back to the file stem.

use crate::error::{Result, TrackCompareError};
use crate::{Track, TrackPoint};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use time::OffsetDateTime;

/// Parse a GPX file.
pub fn parse_gpx_file(path: &Path) -> Result<Track> {
    let file = File::open(path)?;
    let fallback_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    let mut track = parse_gpx_reader(BufReader::new(file), fallback_name)?;
    track.source_file = Some(path.to_path_buf());
    Ok(track)
}

/// Parse a GPX document from any reader.
pub fn parse_gpx_reader<R: Read>(reader: R, fallback_name: &str) -> Result<Track> {
    let doc = gpx::read(reader)?;

    let mut name = fallback_name.to_string();
    let mut points = Vec::new();

    for trk in &doc.tracks {
        if let Some(trk_name) = trk.name.as_deref().filter(|n| !n.is_empty()) {
            name = trk_name.to_string();
        }
        for segment in &trk.segments {
            points.extend(segment.points.iter().map(to_track_point));
        }
    }

    // Some exporters write routes instead of tracks
    for rte in &doc.routes {
        if let Some(rte_name) = rte.name.as_deref().filter(|n| !n.is_empty()) {
            name = rte_name.to_string();
        }
        points.extend(rte.points.iter().map(to_track_point));
    }

    if points.is_empty() {
        return Err(TrackCompareError::EmptyTrack { track: name });
    }

    debug!(
        "[Gpx] Parsed '{}': {} tracks, {} routes, {} points",
        name,
        doc.tracks.len(),
        doc.routes.len(),
        points.len()
    );

    Ok(Track::new(name, points))
}

fn to_track_point(wpt: &gpx::Waypoint) -> TrackPoint {
    let point: geo::Point<f64> = wpt.point();
    TrackPoint {
        latitude: point.y(),
        longitude: point.x(),
        elevation: wpt.elevation,
        time: wpt.time.map(OffsetDateTime::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Morning_Ride</name>
    <trkseg>
      <trkpt lat="47.3700" lon="8.5400"><ele>410.0</ele><time>2024-05-01T07:00:00Z</time></trkpt>
      <trkpt lat="47.3710" lon="8.5400"><ele>412.5</ele><time>2024-05-01T07:00:20Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="47.3720" lon="8.5400"><ele>415.0</ele><time>2024-05-01T07:00:40Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_parse_track_segments() {
        let track = parse_gpx_reader(TRACK_GPX.as_bytes(), "fallback").unwrap();
        assert_eq!(track.name, "Morning_Ride");
        assert_eq!(track.points.len(), 3);
        assert_eq!(track.points[1].latitude, 47.371);
        assert_eq!(track.points[1].longitude, 8.54);
        assert_eq!(track.points[2].elevation, Some(415.0));
        assert!(track.has_timestamps());

        let t0 = track.points[0].time.unwrap();
        let t2 = track.points[2].time.unwrap();
        assert_eq!((t2 - t0).whole_seconds(), 40);
    }

    #[test]
    fn test_parse_route_with_fallback_name() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <rte>
    <rtept lat="51.5074" lon="-0.1278"/>
    <rtept lat="51.5080" lon="-0.1290"/>
  </rte>
</gpx>"#;
        let track = parse_gpx_reader(gpx.as_bytes(), "commute").unwrap();
        assert_eq!(track.name, "commute");
        assert_eq!(track.points.len(), 2);
        assert!(!track.has_elevation());
        assert!(!track.has_timestamps());
    }

    #[test]
    fn test_parse_empty_document() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"></gpx>"#;
        let err = parse_gpx_reader(gpx.as_bytes(), "empty").unwrap_err();
        assert_eq!(
            err,
            TrackCompareError::EmptyTrack {
                track: "empty".to_string()
            }
        );
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_gpx_reader("not xml at all".as_bytes(), "junk").unwrap_err();
        assert!(matches!(err, TrackCompareError::GpxParse { .. }));
    }

    const MIXED_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <rte>
    <name>Detour</name>
    <rtept lat="47.4000" lon="8.6000"/>
  </rte>
  <trk>
    <name>Loop</name>
    <trkseg>
      <trkpt lat="47.3700" lon="8.5400"/>
      <trkpt lat="47.3710" lon="8.5400"/>
    </trkseg>
  </trk>
  <trk>
    <trkseg>
      <trkpt lat="47.3720" lon="8.5400"/>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_tracks_before_routes_and_last_name_wins() {
        let track = parse_gpx_reader(MIXED_GPX.as_bytes(), "fallback").unwrap();

        // Track points come first even though the route precedes them
        let latitudes: Vec<f64> = track.points.iter().map(|p| p.latitude).collect();
        assert_eq!(latitudes, vec![47.37, 47.371, 47.372, 47.4]);
        // The unnamed second track keeps the name; the route is read last
        assert_eq!(track.name, "Detour");
    }

    #[test]
    fn test_unnamed_route_keeps_track_name() {
        let gpx = MIXED_GPX.replace("    <name>Detour</name>\n", "");
        let track = parse_gpx_reader(gpx.as_bytes(), "fallback").unwrap();
        assert_eq!(track.name, "Loop");
        assert_eq!(track.points.len(), 4);
    }
}
