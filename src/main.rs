use anyhow::{bail, Context, Result};
use api_client::HttpAnalyticsClient;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table as ConsoleTable;
use configuration::{Config, LoggingConfig};
use core_types::{text_value, Asset, CustomRange, FeedType, RangeSlot, SystemClock, Timeframe};
use engine::{ReportEngine, ReportInputs, ReportOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use ingestion::{FeedFile, S3Store, Uploader};
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the Traveler report application.
#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be populated.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => configuration::load_config_from(path),
        None => configuration::load_config(),
    }
    .context("Failed to load configuration")?;

    let _log_guard = init_tracing(&config.logging)?;

    match cli.command {
        Commands::Query(args) => handle_query(args, &config).await?,
        Commands::Upload(args) => handle_upload(args, &config).await?,
    }

    Ok(())
}

/// Installs the global subscriber. When a log directory is configured, output
/// goes to a daily rolling file instead of stdout; the returned guard must be
/// held until exit so buffered lines are flushed.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .context("Invalid log filter")?;

    match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "traveler.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(Some(guard))
        }
        None => {
            let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(None)
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Builds traveler reports from the remote analytics service.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./traveler.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one report cycle and write the workbook.
    Query(QueryArgs),
    /// Upload raw feed files for the analytics ETL.
    Upload(UploadArgs),
}

#[derive(Parser)]
struct QueryArgs {
    /// Instrument to report on (NQ, ES, YM, RTY).
    #[arg(long)]
    asset: Option<Asset>,

    /// Timeframes to include, comma separated (e.g. "3m,15m").
    #[arg(long = "timeframes", value_delimiter = ',')]
    timeframes: Vec<Timeframe>,

    /// Report as-of time (e.g. "2024-03-05 18:00"). Defaults to now.
    #[arg(long, value_parser = parse_report_time)]
    at: Option<NaiveDateTime>,

    /// Look-back window in days.
    #[arg(long)]
    scope_days: Option<u32>,

    /// A custom range as "<Label>=<center>", e.g. "High 1=21500". Repeatable.
    #[arg(long = "range", value_parser = parse_range, required = true)]
    ranges: Vec<CustomRange>,

    /// Measurement workbook (.xlsx, .xls or .ods).
    #[arg(long)]
    measurements: Option<PathBuf>,

    /// Result column that splits the report into sheets.
    #[arg(long)]
    group_by: Option<String>,

    /// Directory the workbook is written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Number of result rows to print.
    #[arg(long, default_value_t = 10)]
    preview_rows: usize,
}

#[derive(Parser)]
struct UploadArgs {
    /// Instrument the feed files belong to.
    #[arg(long)]
    asset: Asset,

    /// A feed file as "<timeframe>:<small|big>:<path>", e.g. "3m:small:nq_3m.csv". Repeatable.
    #[arg(long = "file", value_parser = parse_feed_file, required = true)]
    files: Vec<(Timeframe, FeedType, PathBuf)>,
}

fn parse_report_time(raw: &str) -> Result<NaiveDateTime, String> {
    report::parse_timestamp(raw).ok_or_else(|| format!("unrecognised date/time '{}'", raw))
}

fn parse_range(raw: &str) -> Result<CustomRange, String> {
    let (label, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <Label>=<center>, got '{}'", raw))?;
    let slot: RangeSlot = label.parse().map_err(|e| format!("{}", e))?;
    let center: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok(CustomRange::new(slot, true, center))
}

fn parse_feed_file(raw: &str) -> Result<(Timeframe, FeedType, PathBuf), String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(tf), Some(feed), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected <timeframe>:<feed>:<path>, got '{}'", raw));
    };
    let timeframe = tf.parse().map_err(|e| format!("{}", e))?;
    let feed = feed.parse().map_err(|e| format!("{}", e))?;
    Ok((timeframe, feed, PathBuf::from(path)))
}

// ==============================================================================
// Query Command Logic
// ==============================================================================

/// Handles one report-generation cycle.
async fn handle_query(args: QueryArgs, config: &Config) -> Result<()> {
    let defaults = &config.report;

    let measurements = match &args.measurements {
        Some(path) => request::load_measurements(path)?,
        None => {
            tracing::warn!("No measurement file given; querying without measurements.");
            Vec::new()
        }
    };

    let inputs = ReportInputs {
        asset: args.asset.unwrap_or(defaults.asset),
        timeframes: if args.timeframes.is_empty() {
            defaults.timeframes.clone()
        } else {
            args.timeframes
        },
        report_time: args.at,
        scope_days: args.scope_days.unwrap_or(defaults.scope_days),
        ranges: args.ranges,
        measurements,
    };

    let client = HttpAnalyticsClient::new(&config.service)?;
    let engine = ReportEngine::new(Arc::new(client), Arc::new(SystemClock))
        .with_group_key(args.group_by.as_deref().unwrap_or(&defaults.group_by));

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Processing {} on the analytics service...", inputs.asset));

    let outcome = engine.run(inputs).await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    print_summary(&outcome);

    let Some(artifact) = &outcome.artifact else {
        println!("No traveler entries found for the selected ranges.");
        return Ok(());
    };

    print_preview(&outcome.results, args.preview_rows)?;

    let output_dir = args.output_dir.as_ref().unwrap_or(&defaults.output_dir);
    let path = artifact
        .write_to(output_dir)
        .with_context(|| format!("Failed to write report into {}", output_dir.display()))?;
    println!(
        "Wrote {} ({} sheets, {} entries)",
        path.display(),
        artifact.metrics.sheets_written,
        artifact.metrics.total_entries
    );

    Ok(())
}

fn print_summary(outcome: &ReportOutcome) {
    let mut table = ConsoleTable::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Asset".to_string(), outcome.request.asset_id.to_string()]);
    table.add_row(vec![
        "Report time".to_string(),
        outcome.report_time.format("%Y-%m-%d %H:%M").to_string(),
    ]);
    table.add_row(vec!["Traveler entries".to_string(), outcome.count.to_string()]);
    table.add_row(vec![
        "HLC records processed".to_string(),
        outcome.hlc_records_processed.to_string(),
    ]);
    table.add_row(vec![
        "Processing time".to_string(),
        format!("{:.2}s", outcome.elapsed.as_secs_f64()),
    ]);
    println!("{table}");
}

fn print_preview(results: &DataFrame, limit: usize) -> Result<()> {
    if limit == 0 || results.height() == 0 {
        return Ok(());
    }
    let mut table = ConsoleTable::new();
    table.load_preset(UTF8_FULL).set_header(results.get_column_names_str());
    for row in 0..results.height().min(limit) {
        let mut cells = Vec::with_capacity(results.width());
        for column in results.get_columns() {
            cells.push(text_value(column.get(row)?).unwrap_or_default());
        }
        table.add_row(cells);
    }
    println!("{table}");
    if results.height() > limit {
        println!("... {} more rows", results.height() - limit);
    }
    Ok(())
}

// ==============================================================================
// Upload Command Logic
// ==============================================================================

/// Uploads raw feed files into the ingestion bucket.
async fn handle_upload(args: UploadArgs, config: &Config) -> Result<()> {
    let store = S3Store::new(&config.storage.region).await;
    let uploader = Uploader::from_config(Arc::new(store), &config.storage);

    let files: Vec<FeedFile> = args
        .files
        .into_iter()
        .map(|(timeframe, feed, path)| FeedFile {
            path,
            asset: args.asset,
            timeframe,
            feed,
        })
        .collect();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Uploading {} files to {}...", files.len(), uploader.bucket()));
    let summary = uploader.upload_batch(&files).await;
    spinner.finish_and_clear();

    let mut table = ConsoleTable::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Result", "Detail"]);
    for key in &summary.uploaded {
        table.add_row(vec!["uploaded".to_string(), key.clone()]);
    }
    for (path, err) in &summary.failed {
        table.add_row(vec![format!("failed: {}", path.display()), err.to_string()]);
    }
    println!("{table}");

    if !summary.is_complete() {
        bail!(
            "{} of {} uploads failed",
            summary.failed.len(),
            summary.failed.len() + summary.uploaded.len()
        );
    }
    Ok(())
}
