//! Comparison charts: route overlay, elevation profiles and speed profiles.
//!
//! The route map is always drawn. The elevation panel is added when both
//! tracks carry elevation, the speed panel when both carry timestamps.
//! Segments that lead into a point near the other track are highlighted on
//! the route map when an [`OverlapResult`] is supplied.
//!
//! The output format follows the file extension: `.svg` goes through the SVG
//! backend (text is written as SVG `<text>`), anything else is encoded as a
//! PNG bitmap. Rasterizing text needs a font engine, which only the
//! `chart-fonts` feature compiles in; without it PNG charts have no labels.
//!
//! ## Example
//! ```rust,no_run
//! use std::path::Path;
//! use track_compare::{charts, parse_gpx_file};
//!
//! let a = parse_gpx_file(Path::new("morning.gpx")).unwrap();
//! let b = parse_gpx_file(Path::new("evening.gpx")).unwrap();
//! charts::render_comparison_chart(&a, &b, None, Path::new("comparison.svg")).unwrap();
//! ```

use crate::error::{Result, TrackCompareError};
use crate::geo_utils::haversine_distance;
use crate::metrics::{cumulative_distances, MAX_PLAUSIBLE_SPEED_KMH};
use crate::overlap::{segment_runs, OverlapResult};
use crate::{Track, TrackPoint};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingErrorKind,
};
use std::ops::Range;
use std::path::Path;
use time::OffsetDateTime;

/// Pixel size of one chart panel.
pub const PANEL_SIZE: (u32, u32) = (1200, 400);

const FIRST_COLOR: RGBColor = RGBColor(31, 90, 200);
const SECOND_COLOR: RGBColor = RGBColor(210, 40, 40);
const SHARED_COLOR: RGBColor = RGBColor(130, 60, 170);
const FIRST_MARKER: RGBColor = RGBColor(34, 139, 34);
const SECOND_MARKER: RGBColor = RGBColor(200, 0, 200);

type DrawResult<DB> =
    std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

/// Image format of a chart file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    /// `.svg` (any case) selects SVG; everything else is PNG.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ChartFormat::Svg,
            _ => ChartFormat::Png,
        }
    }
}

/// Elevation against cumulative distance: `(km, meters)` for every point
/// that carries an elevation.
pub fn elevation_profile(points: &[TrackPoint]) -> Vec<(f64, f64)> {
    cumulative_distances(points)
        .into_iter()
        .zip(points)
        .filter_map(|(distance, p)| p.elevation.map(|e| (distance / 1000.0, e)))
        .collect()
}

/// Segment speed against distance travelled: `(km, km/h)` per timed segment.
///
/// Segments with a non-positive time step are skipped. A segment faster than
/// [`MAX_PLAUSIBLE_SPEED_KMH`] repeats the previous reading (0 at the start).
pub fn speed_profile(points: &[TrackPoint]) -> Vec<(f64, f64)> {
    let timed: Vec<(&TrackPoint, OffsetDateTime)> = points
        .iter()
        .filter_map(|p| p.time.map(|t| (p, t)))
        .collect();

    let mut profile: Vec<(f64, f64)> = Vec::new();
    let mut distance_km = 0.0;

    for w in timed.windows(2) {
        let (p1, t1) = w[0];
        let (p2, t2) = w[1];

        let secs = (t2 - t1).as_seconds_f64();
        if secs <= 0.0 {
            continue;
        }

        let km = haversine_distance(p1, p2) / 1000.0;
        let mut speed = km / secs * 3600.0;
        if speed > MAX_PLAUSIBLE_SPEED_KMH {
            speed = profile.last().map_or(0.0, |&(_, s)| s);
        }

        distance_km += km;
        profile.push((distance_km, speed));
    }

    profile
}

/// Polylines `(lon, lat)` of the segments that lead into near points.
///
/// Each near run contributes one polyline, starting at the point before the
/// run so the entering segment is included.
pub fn shared_paths(
    points: &[TrackPoint],
    classifications: &[bool],
) -> Result<Vec<Vec<(f64, f64)>>> {
    let runs = segment_runs(points, classifications)?;
    Ok(runs
        .iter()
        .filter(|run| run.near)
        .map(|run| {
            points[run.start_index.saturating_sub(1)..=run.end_index]
                .iter()
                .map(lon_lat)
                .collect::<Vec<_>>()
        })
        .filter(|path| path.len() >= 2)
        .collect())
}

/// Draw the comparison chart for two tracks into `path`.
pub fn render_comparison_chart(
    track1: &Track,
    track2: &Track,
    overlap: Option<&OverlapResult>,
    path: &Path,
) -> Result<()> {
    let data = ChartData::prepare(track1, track2, overlap)?;
    let size = data.canvas_size();

    match ChartFormat::from_path(path) {
        ChartFormat::Png => {
            let root = LabelSafeBackend::new(BitMapBackend::new(path, size)).into_drawing_area();
            draw_comparison(&root, &data).map_err(chart_error)?;
        }
        ChartFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_comparison(&root, &data).map_err(chart_error)?;
        }
    }

    info!(
        "[Chart] Saved {} ({} panels, {}x{})",
        path.display(),
        data.panel_count(),
        size.0,
        size.1
    );
    Ok(())
}

/// Draw the comparison chart for two tracks as an SVG document.
pub fn comparison_chart_svg(
    track1: &Track,
    track2: &Track,
    overlap: Option<&OverlapResult>,
) -> Result<String> {
    let data = ChartData::prepare(track1, track2, overlap)?;
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, data.canvas_size()).into_drawing_area();
        draw_comparison(&root, &data).map_err(chart_error)?;
    }
    Ok(svg)
}

/// Everything the panels plot, computed before any drawing starts.
struct ChartData<'a> {
    tracks: [&'a Track; 2],
    shared: [Vec<Vec<(f64, f64)>>; 2],
    elevation: Option<[Vec<(f64, f64)>; 2]>,
    speed: Option<[Vec<(f64, f64)>; 2]>,
}

impl<'a> ChartData<'a> {
    fn prepare(
        track1: &'a Track,
        track2: &'a Track,
        overlap: Option<&OverlapResult>,
    ) -> Result<Self> {
        track1.validate()?;
        track2.validate()?;

        let shared = match overlap {
            Some(result) => [
                shared_paths(&track1.points, &result.first.classifications)?,
                shared_paths(&track2.points, &result.second.classifications)?,
            ],
            None => [Vec::new(), Vec::new()],
        };

        let elevation = (track1.has_elevation() && track2.has_elevation()).then(|| {
            [
                elevation_profile(&track1.points),
                elevation_profile(&track2.points),
            ]
        });
        let speed = (track1.has_timestamps() && track2.has_timestamps())
            .then(|| [speed_profile(&track1.points), speed_profile(&track2.points)]);

        Ok(Self {
            tracks: [track1, track2],
            shared,
            elevation,
            speed,
        })
    }

    fn panel_count(&self) -> usize {
        1 + usize::from(self.elevation.is_some()) + usize::from(self.speed.is_some())
    }

    fn canvas_size(&self) -> (u32, u32) {
        (PANEL_SIZE.0, PANEL_SIZE.1 * self.panel_count() as u32)
    }
}

struct ProfileStyle {
    title: &'static str,
    y_desc: &'static str,
    /// Fill under the line and fit the y axis to the data
    filled: bool,
}

const ELEVATION_STYLE: ProfileStyle = ProfileStyle {
    title: "Elevation Profiles",
    y_desc: "Elevation (m)",
    filled: true,
};

const SPEED_STYLE: ProfileStyle = ProfileStyle {
    title: "Speed Profiles",
    y_desc: "Speed (km/h)",
    filled: false,
};

fn chart_error<E: std::error::Error + Send + Sync>(
    err: DrawingAreaErrorKind<E>,
) -> TrackCompareError {
    TrackCompareError::Chart {
        message: err.to_string(),
    }
}

fn lon_lat(p: &TrackPoint) -> (f64, f64) {
    (p.longitude, p.latitude)
}

/// Data range widened by 5% on each side, never narrower than `min_span`.
fn padded_range(values: impl Iterator<Item = f64>, min_span: f64) -> Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..min_span;
    }
    let pad = ((hi - lo) * 0.05).max(min_span / 2.0);
    (lo - pad)..(hi + pad)
}

fn draw_comparison<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    data: &ChartData<'_>,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;

    let panels = root.split_evenly((data.panel_count(), 1));
    draw_route_map(&panels[0], data)?;

    let mut next = 1;
    if let Some(profiles) = &data.elevation {
        draw_profile(&panels[next], &ELEVATION_STYLE, data, profiles)?;
        next += 1;
    }
    if let Some(profiles) = &data.speed {
        draw_profile(&panels[next], &SPEED_STYLE, data, profiles)?;
    }

    root.present()
}

fn draw_route_map<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    data: &ChartData<'_>,
) -> DrawResult<DB> {
    let all_points = || data.tracks.iter().flat_map(|t| t.points.iter());
    let lon_range = padded_range(all_points().map(|p| p.longitude), 1e-3);
    let lat_range = padded_range(all_points().map(|p| p.latitude), 1e-3);

    let mut chart = ChartBuilder::on(area)
        .caption("Route Comparison", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(lon_range, lat_range)?;

    chart
        .configure_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .light_line_style(&BLACK.mix(0.05))
        .draw()?;

    // Shared stretches go underneath both routes
    let shared_style = Color::stroke_width(&SHARED_COLOR.mix(0.45), 8);
    let mut shared_labelled = false;
    for path in data.shared.iter().flatten() {
        let series = chart.draw_series(LineSeries::new(path.iter().copied(), shared_style))?;
        if !shared_labelled {
            series
                .label("Shared")
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], shared_style));
            shared_labelled = true;
        }
    }

    for (track, color) in data.tracks.iter().zip([FIRST_COLOR, SECOND_COLOR]) {
        let style = Color::stroke_width(&color.mix(0.8), 2);
        chart
            .draw_series(LineSeries::new(track.points.iter().map(lon_lat), style))?
            .label(track.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    // Start and end markers; only the first track's are listed in the legend
    let markers = [
        (data.tracks[0], FIRST_MARKER, 7, true),
        (data.tracks[1], SECOND_MARKER, 5, false),
    ];
    for (track, color, size, labelled) in markers {
        let (Some(first), Some(last)) = (track.points.first(), track.points.last()) else {
            continue;
        };
        let start = chart.draw_series(std::iter::once(Circle::new(
            lon_lat(first),
            size,
            color.filled(),
        )))?;
        if labelled {
            start
                .label("Start (Track 1)")
                .legend(move |(x, y)| Circle::new((x + 10, y), 5, color.filled()));
        }
        let end = chart.draw_series(std::iter::once(TriangleMarker::new(
            lon_lat(last),
            size + 2,
            color.filled(),
        )))?;
        if labelled {
            end.label("End (Track 1)")
                .legend(move |(x, y)| TriangleMarker::new((x + 10, y), 6, color.filled()));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

fn draw_profile<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    style: &ProfileStyle,
    data: &ChartData<'_>,
    profiles: &[Vec<(f64, f64)>; 2],
) -> DrawResult<DB> {
    let x_max = profiles
        .iter()
        .flatten()
        .map(|&(x, _)| x)
        .fold(0.0, f64::max)
        .max(0.1);
    let y_range = if style.filled {
        padded_range(profiles.iter().flatten().map(|&(_, y)| y), 10.0)
    } else {
        let y_max = profiles.iter().flatten().map(|&(_, y)| y).fold(0.0, f64::max);
        0.0..(y_max * 1.1).max(1.0)
    };
    let baseline = y_range.start;

    let mut chart = ChartBuilder::on(area)
        .caption(style.title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Distance (km)")
        .y_desc(style.y_desc)
        .light_line_style(&BLACK.mix(0.05))
        .draw()?;

    for ((track, profile), color) in data
        .tracks
        .iter()
        .zip(profiles)
        .zip([FIRST_COLOR, SECOND_COLOR])
    {
        if style.filled {
            chart.draw_series(AreaSeries::new(profile.iter().copied(), baseline, color.mix(0.2)))?;
        }
        let line = Color::stroke_width(&color.mix(0.8), if style.filled { 2 } else { 1 });
        chart
            .draw_series(LineSeries::new(profile.iter().copied(), line))?
            .label(track.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

/// Bitmap backend that only rasterizes text when a font engine is compiled in.
///
/// Without `chart-fonts`, plotters has no glyph source and panics on bitmap
/// text, so labels are skipped. Layout still uses plotters' size estimates.
struct LabelSafeBackend<DB> {
    inner: DB,
}

impl<DB> LabelSafeBackend<DB> {
    fn new(inner: DB) -> Self {
        Self { inner }
    }
}

impl<DB: DrawingBackend> DrawingBackend for LabelSafeBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.fill_polygon(vert, style)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        size: (u32, u32),
        src: &[u8],
    ) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, size, src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> std::result::Result<(), DrawingErrorKind<Self::ErrorType>> {
        if cfg!(feature = "chart-fonts") {
            self.inner.draw_text(text, style, pos)
        } else {
            Ok(())
        }
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> std::result::Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        self.inner.estimate_text_size(text, style)
    }
}
