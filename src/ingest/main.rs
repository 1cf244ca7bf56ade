//! KML zone ingest tool.
//!
//! Loads a boundary document with a progress bar, reports how many zones it
//! contains and optionally checks points against them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use zonefinder::config::Config;
use zonefinder::{render_report, Coordinate, LoadOutcome, QueryOutcome, QueryResult, QueryService};

/// Progress bar resolution
const PROGRESS_STEPS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Load a KML boundary document and check points against it")]
struct Args {
    /// KML file to load
    #[arg(short, long)]
    file: PathBuf,

    /// Point to check as LAT,LNG (repeatable)
    #[arg(short, long = "point", value_parser = parse_point, allow_hyphen_values = true)]
    points: Vec<Coordinate>,

    /// Print results as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Zones between progress updates (overrides config)
    #[arg(long)]
    progress_every: Option<usize>,
}

#[derive(Serialize)]
struct PointReport<'a> {
    point: Coordinate,
    results: &'a [QueryResult],
    candidates: usize,
    took_us: u128,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(every) = args.progress_every {
        config.parser.progress_every = every;
    }

    info!("Zonefinder Ingest");
    info!("File: {}", args.file.display());

    let service = QueryService::new(config.parser);

    let bar = ProgressBar::new(PROGRESS_STEPS);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40}] {percent}% {msg}")?
            .progress_chars("=> "),
    );

    let progress_bar = bar.clone();
    let outcome = service
        .load_path(&args.file, move |progress| {
            progress_bar.set_position((progress.fraction * PROGRESS_STEPS as f64) as u64);
            progress_bar.set_message(format!("{} zones", progress.zones_found));
        })
        .await
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    bar.finish_and_clear();

    match outcome {
        LoadOutcome::Loaded(report) => {
            info!(
                "Loaded {} zones in {:?}",
                report.zone_count, report.elapsed
            );
        }
        LoadOutcome::Cancelled => {
            warn!("Load cancelled");
            return Ok(());
        }
    }

    for point in &args.points {
        let check = match service.query(*point).await? {
            QueryOutcome::Completed(check) => check,
            QueryOutcome::NothingLoaded => {
                warn!("No zones loaded, skipping {}", point);
                continue;
            }
        };

        if args.json {
            let report = PointReport {
                point: *point,
                results: &check.results,
                candidates: check.candidates,
                took_us: check.elapsed.as_micros(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("Point {}:", point);
            let text = render_report(&check.results);
            if check.results.is_empty() {
                println!("{}\n", text);
            } else {
                print!("{}", text);
            }
        }
    }

    Ok(())
}

/// Parse "LAT,LNG"
fn parse_point(s: &str) -> Result<Coordinate, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got {:?}", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude {:?}: {}", lat, e))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude {:?}: {}", lng, e))?;
    Ok(Coordinate::new(lat, lng))
}
