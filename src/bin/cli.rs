//! track-compare CLI - compare two GPX tracks
//!
//! Usage:
//!   track-compare-cli <track1.gpx> <track2.gpx> [--overlap-threshold <m>] [--json] [--runs]
//!                     [-o <chart.png|chart.svg>] [--no-chart]
//!
//! Prints distance, elevation and timing metrics side by side, followed by
//! the route overlap analysis, and writes a comparison chart.

use clap::Parser;
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use track_compare::{
    analyze_overlap, calculate_metrics, format_metrics_comparison, format_overlap_result,
    parse_gpx_file, segment_runs, ComparisonReport, OverlapResult, OverlapThreshold, SegmentRun,
    Track,
};

const DEFAULT_CHART_PATH: &str = "comparison.png";

#[derive(Parser)]
#[command(name = "track-compare-cli")]
#[command(about = "Compare and analyze GPX tracks", long_about = None)]
struct Cli {
    /// Path to first GPX file
    track1: PathBuf,

    /// Path to second GPX file
    track2: PathBuf,

    /// Distance threshold in meters for overlap detection
    #[arg(long, default_value_t = 50.0)]
    overlap_threshold: f64,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// List the near/far segment runs of each track (also added to --json output)
    #[arg(long)]
    runs: bool,

    /// Output path for the comparison chart, PNG or SVG by extension [default: comparison.png]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip chart generation
    #[arg(long)]
    no_chart: bool,

    /// Enable verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let threshold = OverlapThreshold::new(cli.overlap_threshold).map_err(|e| e.to_string())?;

    let track1 = load_track(&cli.track1)?;
    let track2 = load_track(&cli.track2)?;

    let metrics1 = calculate_metrics(&track1);
    let metrics2 = calculate_metrics(&track2);

    let overlap = analyze_overlap(&track1, &track2, threshold).map_err(|e| e.to_string())?;

    let runs = if cli.runs {
        let first = segment_runs(&track1.points, &overlap.first.classifications)
            .map_err(|e| e.to_string())?;
        let second = segment_runs(&track2.points, &overlap.second.classifications)
            .map_err(|e| e.to_string())?;
        Some((first, second))
    } else {
        None
    };

    if cli.json {
        let mut report = ComparisonReport::new(metrics1, metrics2, overlap.clone());
        if let Some((first, second)) = runs {
            report = report.with_runs(first, second);
        }
        let json = report.to_json(cli.runs).map_err(|e| e.to_string())?;
        println!("{}", json);
    } else {
        println!("{}", format_metrics_comparison(&metrics1, &metrics2));
        println!("{}", format_overlap_result(&overlap));

        if let Some((first, second)) = &runs {
            print_runs(&track1, first);
            print_runs(&track2, second);
        }
    }

    if !cli.no_chart {
        write_chart(cli, &track1, &track2, &overlap);
    }

    Ok(())
}

fn chart_path(cli: &Cli) -> PathBuf {
    cli.output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CHART_PATH))
}

/// Chart failures are reported but do not fail the comparison.
#[cfg(feature = "charts")]
fn write_chart(cli: &Cli, track1: &Track, track2: &Track, overlap: &OverlapResult) {
    let path = chart_path(cli);
    match track_compare::render_comparison_chart(track1, track2, Some(overlap), &path) {
        // Keep stdout clean for JSON consumers
        Ok(()) if cli.json => debug!("Chart saved to: {}", path.display()),
        Ok(()) => println!("Chart saved to: {}", path.display()),
        Err(e) => eprintln!("Warning: Could not generate chart: {}", e),
    }
}

#[cfg(not(feature = "charts"))]
fn write_chart(cli: &Cli, _track1: &Track, _track2: &Track, _overlap: &OverlapResult) {
    log::warn!(
        "Built without the `charts` feature, not writing {}",
        chart_path(cli).display()
    );
}

fn load_track(path: &Path) -> Result<Track, String> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()));
    }
    let track = parse_gpx_file(path)
        .map_err(|e| format!("Could not parse {}: {}", path.display(), e))?;
    debug!(
        "Loaded '{}' from {} ({} points)",
        track.name,
        path.display(),
        track.points.len()
    );
    Ok(track)
}

fn print_runs(track: &Track, runs: &[SegmentRun]) {
    println!("SEGMENT RUNS: {}", track.name);
    println!("{}", "-".repeat(70));
    for run in runs {
        println!(
            "  {:>5} - {:<5} {:<6} {:>6} pts {:>10.2} km",
            run.start_index,
            run.end_index,
            if run.near { "shared" } else { "unique" },
            run.point_count(),
            run.distance_meters / 1000.0
        );
    }
    println!();
}
