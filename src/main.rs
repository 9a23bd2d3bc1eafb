//! CLI entry point for the transit insights tool.
//!
//! Provides subcommands for collecting vehicle positions, stop coordinates and
//! timetables from the UM Warszawa API, and for running the speed and
//! punctuality analyses on the collected tables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_insights::{
    analyzers::{
        filter::{of_time_window_str, remove_duplicates},
        punctuality::punctuality_for_lines,
        report::punctuality_summary,
        speed::{full_incidents_summary, short_incidents_summary},
        timetable::{DirectoryTimetables, TimetableSource, timetable_file_name},
    },
    api::{
        UmWawApi,
        session::{DownloadSession, PollSettings, poll_over_time},
    },
    config::AnalysisConfig,
    fetch::BasicClient,
    model::{STOP_COLUMNS, StopRecord, VEHICLE_COLUMNS, VehicleObservation},
    output::{load_records, print_json, write_records},
};

#[derive(Parser)]
#[command(name = "transit_insights")]
#[command(about = "Speed and punctuality insights from Warsaw public transport data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll live bus positions and store them as one CSV table
    FetchVehicles {
        /// CSV file to write positions to
        #[arg(short, long)]
        output: PathBuf,

        /// Number of snapshots to collect
        #[arg(short = 'n', long, default_value_t = 1)]
        requests: usize,

        /// Minutes between snapshots
        #[arg(short, long, default_value_t = 1)]
        interval: u64,

        /// Attempts before giving up after upstream failures
        #[arg(short, long, default_value_t = 3)]
        attempts: usize,

        /// JSON file holding snapshots collected before a failure
        #[arg(long, default_value = "partial_vehicles.json")]
        partial: PathBuf,

        /// Remove the partial file when every attempt fails
        #[arg(long, default_value_t = false)]
        discard_partial: bool,
    },
    /// Download coordinates of every stop post
    FetchStops {
        /// CSV file to write stops to
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Download the timetable of a line at one stop post
    FetchTimetable {
        stop_id: String,
        stop_number: String,
        line: String,

        /// Directory to store the timetable in
        #[arg(short, long, default_value = "timetables")]
        dir: PathBuf,
    },
    /// Report speed-limit violations
    Speed {
        /// CSV table of vehicle positions
        vehicles: PathBuf,

        /// Speed limit in km/h (overrides the config file)
        #[arg(short, long)]
        limit: Option<u32>,

        /// Write every incident to this CSV file
        #[arg(long, conflicts_with = "full")]
        incidents: Option<PathBuf>,

        /// Also rank lines and places by number of incidents
        #[arg(long, default_value_t = false)]
        full: bool,

        /// Write the mean incident position of every line to this CSV file
        #[arg(long, requires = "full")]
        hotspots: Option<PathBuf>,

        /// JSON file with analysis settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Report the share of late stop visits per line
    Punctuality {
        /// CSV table of vehicle positions
        vehicles: PathBuf,

        /// CSV table of stop coordinates
        stops: PathBuf,

        /// Directory with timetables saved by `fetch-timetable`
        #[arg(long, conflicts_with = "live", required_unless_present = "live")]
        timetables: Option<PathBuf>,

        /// Download timetables from the API while analysing
        #[arg(long, default_value_t = false)]
        live: bool,

        /// Distance in metres that counts as being at a stop
        #[arg(short, long)]
        proximity: Option<u32>,

        /// Minutes off the timetable that count as an incident
        #[arg(short, long)]
        threshold: Option<u32>,

        /// Ignore positions before this time
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Ignore positions after this time
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Log progress and print the per-line records
        #[arg(short, long, default_value_t = false)]
        verbose: bool,

        /// JSON file with analysis settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_insights.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_insights.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::FetchVehicles {
            output,
            requests,
            interval,
            attempts,
            partial,
            discard_partial,
        } => {
            let api = connect()?;
            let settings = PollSettings {
                requests,
                interval: Duration::from_secs(interval * 60),
                attempts,
                keep_partial: !discard_partial,
            };

            let session = DownloadSession::resume(&partial)?;
            let snapshots = poll_over_time(session, &settings, || api.active_vehicles())?;

            let positions: Vec<VehicleObservation> = snapshots.into_iter().flatten().collect();
            let positions = remove_duplicates(&positions);
            write_records(&output, &positions)?;
            info!(rows = positions.len(), output = %output.display(), "Vehicle positions saved");
        }
        Commands::FetchStops { output } => {
            let stops = connect()?.stop_coordinates()?;
            write_records(&output, &stops)?;
            info!(rows = stops.len(), output = %output.display(), "Stops saved");
        }
        Commands::FetchTimetable {
            stop_id,
            stop_number,
            line,
            dir,
        } => {
            let entries = connect()?.timetable_for_line_on_stop(&stop_id, &stop_number, &line)?;
            let path = dir.join(timetable_file_name(&stop_id, &stop_number, &line));
            write_records(&path, &entries)?;
            info!(rows = entries.len(), output = %path.display(), "Timetable saved");
        }
        Commands::Speed {
            vehicles,
            limit,
            incidents,
            full,
            hotspots,
            config,
        } => {
            let config = AnalysisConfig::load_or_default(config.as_deref())
                .context("Failed to load analysis config")?;
            let limit = limit.unwrap_or(config.speed_limit_kmh);
            let data = load_vehicles(&vehicles)?;

            if full {
                let (summary, lines) = full_incidents_summary(&data, limit)?;
                print!("{summary}");
                if let Some(path) = hotspots {
                    write_records(&path, &lines)?;
                }
            } else {
                let (summary, found) = short_incidents_summary(&data, limit)?;
                print!("{summary}");
                if let Some(path) = incidents {
                    write_records(&path, &found)?;
                }
            }
        }
        Commands::Punctuality {
            vehicles,
            stops,
            timetables,
            live,
            proximity,
            threshold,
            start,
            end,
            verbose,
            config,
        } => {
            let mut config = AnalysisConfig::load_or_default(config.as_deref())
                .context("Failed to load analysis config")?;
            if let Some(proximity) = proximity {
                config.proximity_m = proximity;
            }
            if let Some(threshold) = threshold {
                config.late_threshold_minutes = threshold;
            }

            let mut data = load_vehicles(&vehicles)?;
            if let (Some(start), Some(end)) = (&start, &end) {
                data = of_time_window_str(&data, start, end)?;
            }
            let stops: Vec<StopRecord> = load_records(&stops, STOP_COLUMNS)
                .with_context(|| format!("Failed to load stops from {}", stops.display()))?;

            let source: Box<dyn TimetableSource> = match timetables {
                Some(dir) if !live => Box::new(DirectoryTimetables::new(dir)),
                _ => Box::new(connect()?),
            };

            let by_line = punctuality_for_lines(&data, &stops, source.as_ref(), &config.punctuality(verbose))?;
            if verbose {
                print_json(&by_line)?;
            }
            print!("{}", punctuality_summary(&by_line));
        }
    }

    Ok(())
}

/// API client authenticated with the key from `UMWAW_API_KEY`.
fn connect() -> Result<UmWawApi<BasicClient>> {
    let api_key = std::env::var("UMWAW_API_KEY").context("UMWAW_API_KEY must be set")?;
    let client = BasicClient::with_timeouts(Duration::from_secs(30), Duration::from_secs(10))?;
    Ok(UmWawApi::new(client, api_key))
}

/// Loads a vehicle position table, dropping repeated rows.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
fn load_vehicles(path: &Path) -> Result<Vec<VehicleObservation>> {
    let data: Vec<VehicleObservation> = load_records(path, VEHICLE_COLUMNS)
        .with_context(|| format!("Failed to load vehicle positions from {}", path.display()))?;
    Ok(remove_duplicates(&data))
}
