//! stsdetect CLI - batch encounter detection over AIS position files
//!
//! Usage:
//!   stsdetect-cli detect <positions.csv> --output <runs.csv> [--events <events.csv>]
//!   stsdetect-cli gaps <positions.csv> --output <gaps.csv> [--threshold-minutes <n>]
//!
//! The input is a CSV of position records with columns
//! `vessel_id,callsign,timestamp,lon,lat,speed` (RFC 3339 timestamps).

use clap::{Parser, Subcommand};
use log::{info, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Duration;
use stsdetect::{
    export, gaps::find_reporting_gaps, CsvSource, Detector, DetectorConfig, PositionRecord,
    RegionBounds, Result,
};

#[derive(Parser)]
#[command(name = "stsdetect-cli")]
#[command(about = "Detect sustained close-proximity vessel encounters in AIS data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full detection pipeline and write encounter runs
    Detect {
        /// CSV file of position records
        input: PathBuf,

        /// Output CSV for encounter runs
        #[arg(short, long)]
        output: PathBuf,

        /// Optional output CSV for the raw per-bin proximity events
        #[arg(long)]
        events: Option<PathBuf>,

        /// Region bounds, degrees
        #[arg(long, default_value_t = 55.0, allow_hyphen_values = true)]
        lat_min: f64,
        #[arg(long, default_value_t = 90.0, allow_hyphen_values = true)]
        lat_max: f64,
        #[arg(long, default_value_t = -10.0, allow_hyphen_values = true)]
        lon_min: f64,
        #[arg(long, default_value_t = 45.0, allow_hyphen_values = true)]
        lon_max: f64,

        /// Tiles per axis
        #[arg(long, default_value_t = 5)]
        lat_tiles: u32,
        #[arg(long, default_value_t = 5)]
        lon_tiles: u32,

        /// Resampling grid step in minutes
        #[arg(long, default_value_t = 10)]
        step_minutes: i64,

        /// Maximum reporting gap to interpolate across, in minutes
        #[arg(long, default_value_t = 30)]
        max_gap_minutes: i64,

        /// Proximity distance threshold in meters
        #[arg(short, long, default_value_t = 50.0)]
        distance: f64,

        /// Minimum detections per emitted run
        #[arg(long, default_value_t = 2)]
        min_points: u32,

        /// Minimum run duration in minutes (in addition to --min-points)
        #[arg(long)]
        min_duration_minutes: Option<i64>,

        /// Drop records reporting speed at or below this value
        #[arg(long)]
        min_speed: Option<f64>,

        /// Only process records with one of these callsigns (comma separated)
        #[arg(long, value_delimiter = ',')]
        callsigns: Option<Vec<String>>,
    },

    /// Survey per-vessel reporting gaps
    Gaps {
        /// CSV file of position records
        input: PathBuf,

        /// Output CSV for reporting gaps
        #[arg(short, long)]
        output: PathBuf,

        /// Minimum silence to report, in minutes
        #[arg(long, default_value_t = 60)]
        threshold_minutes: i64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Commands::Detect {
            input,
            output,
            events,
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            lat_tiles,
            lon_tiles,
            step_minutes,
            max_gap_minutes,
            distance,
            min_points,
            min_duration_minutes,
            min_speed,
            callsigns,
        } => {
            let config = DetectorConfig {
                region: RegionBounds::new(lat_min, lat_max, lon_min, lon_max),
                lat_tiles,
                lon_tiles,
                resample_step: Duration::minutes(step_minutes),
                max_interpolation_gap: Duration::minutes(max_gap_minutes),
                distance_threshold_m: distance,
                min_point_count: min_points,
                min_duration: min_duration_minutes.map(Duration::minutes),
                min_speed,
                callsign_filter: callsigns.map(|list| list.into_iter().collect::<HashSet<_>>()),
            };
            run_detect(&input, &output, events.as_deref(), config)
        }
        Commands::Gaps {
            input,
            output,
            threshold_minutes,
        } => run_gaps(&input, &output, Duration::minutes(threshold_minutes)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run_detect(
    input: &Path,
    output: &Path,
    events_out: Option<&Path>,
    config: DetectorConfig,
) -> Result<()> {
    let detector = Detector::new(config)?;
    let source = CsvSource::new(input);
    let batch = detector.run(&source)?;

    if source.malformed_rows() > 0 {
        warn!(
            "dropped {} malformed rows from {}",
            source.malformed_rows(),
            input.display()
        );
    }

    let s = &batch.summary;
    info!(
        "records: {} read, {} invalid, {} filtered (speed), {} filtered (callsign)",
        s.records_read, s.records_dropped_invalid, s.records_filtered_slow, s.records_filtered_callsign
    );
    info!(
        "vessel-days: {} resampled, {} skipped (fewer than 2 points)",
        s.vessel_days_resampled, s.vessel_days_skipped
    );
    if s.tiles_failed > 0 {
        warn!("{} of {} tile reads failed", s.tiles_failed, s.tiles_total);
    }

    export::write_runs_to_path(output, &batch.runs)?;
    info!("wrote {} encounter runs to {}", batch.runs.len(), output.display());

    if let Some(path) = events_out {
        export::write_events_to_path(path, &batch.events)?;
        info!("wrote {} proximity events to {}", batch.events.len(), path.display());
    }

    Ok(())
}

fn run_gaps(input: &Path, output: &Path, threshold: Duration) -> Result<()> {
    let records = load_positions(input)?;
    info!("loaded {} position records from {}", records.len(), input.display());

    let gaps = find_reporting_gaps(&records, threshold);
    export::write_gaps_to_path(output, &gaps)?;
    info!(
        "wrote {} reporting gaps (> {} min) to {}",
        gaps.len(),
        threshold.num_minutes(),
        output.display()
    );
    Ok(())
}

fn load_positions(path: &Path) -> Result<Vec<PositionRecord>> {
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    let mut records = Vec::new();
    let mut malformed = 0usize;
    for row in reader.deserialize() {
        match row {
            Ok(record) => records.push(record),
            // Unparseable timestamps or numbers drop the row, not the batch
            Err(err) => {
                malformed += 1;
                log::debug!("dropping malformed row: {err}");
            }
        }
    }
    if malformed > 0 {
        warn!("dropped {malformed} malformed rows from {}", path.display());
    }
    Ok(records)
}
