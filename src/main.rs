use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use purgemon_service::alert::{ready_to_sample_at, stabilized_at, unstable_intervals_after};
use purgemon_service::analysis::test_stability;
use purgemon_service::config::PurgeConfig;
use purgemon_service::ingest::timestamp::parse_utc_millis;
use purgemon_service::ingest::{self, ClockAdjustment, LogFormat};
use purgemon_service::logging::{self, LogLevel, LogSource};
use purgemon_service::model::PurgeError;

#[derive(Parser)]
#[command(name = "purgemon", about = "Well purge stability report for a sonde log")]
struct Cli {
    /// Instrument log: `.csv` export or `.json` In-Situ record set.
    log: PathBuf,

    /// Override the format picked from the file extension (csv or json).
    #[arg(long)]
    format: Option<String>,

    /// Pump start, in the instrument's clock. Defaults to the first sample.
    #[arg(long)]
    purge_start: Option<String>,

    /// Local minus UTC offset in minutes. Defaults to the host offset.
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<i64>,

    /// TOML configuration file. Defaults to $PURGEMON_CONFIG, then built-ins.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured window width.
    #[arg(long)]
    window_minutes: Option<u32>,

    /// Append logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<String>,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn resolve_format(cli: &Cli) -> Result<LogFormat, PurgeError> {
    match cli.format.as_deref() {
        Some(name) => LogFormat::from_path(&PathBuf::from(format!("log.{}", name))),
        None => LogFormat::from_path(&cli.log),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    logging::init_logger(level, cli.log_file.as_deref(), true)?;

    let mut config = match &cli.config {
        Some(path) => PurgeConfig::load(path),
        None => PurgeConfig::from_env(),
    }
    .inspect_err(|e| logging::log_normalize_failure(LogSource::System, None, "Load config", e))?;
    if let Some(minutes) = cli.window_minutes {
        config.stability.window_minutes = minutes;
    }

    let well = cli.log.file_stem().and_then(|s| s.to_str()).map(str::to_string);
    let well_id = well.as_deref();
    let clock = cli
        .utc_offset
        .map(ClockAdjustment::from_offset_minutes)
        .unwrap_or_else(ClockAdjustment::local);

    let format = resolve_format(&cli)?;
    let source = LogSource::from(format);
    let raw = std::fs::read_to_string(&cli.log)?;

    let normalized = ingest::normalize(&raw, format, clock).inspect_err(|e| {
        logging::log_normalize_failure(source, well_id, "Normalize", e);
    })?;
    logging::log_normalize_summary(source, well_id, &normalized);

    let table = &normalized.table;
    let purge_start = match cli.purge_start.as_deref() {
        Some(text) => parse_utc_millis(text)
            .and_then(|utc| clock.apply(utc))
            .ok_or_else(|| PurgeError::InvalidTimestamp {
                row: 0,
                value: text.to_string(),
            })?,
        None => table
            .datetime()
            .and_then(|t| t.first().copied())
            .ok_or(PurgeError::EmptyLog)?,
    };

    let report = test_stability(table, config.stability.window_ms(), &config.criteria)
        .inspect_err(|e| {
            logging::log_normalize_failure(LogSource::Stability, well_id, "Stability test", e);
        })?;
    let settle_ms = config.stability.settle_ms();
    let annotations = unstable_intervals_after(&report, purge_start, settle_ms);
    let stable: serde_json::Map<String, serde_json::Value> = stabilized_at(&report, purge_start, settle_ms)
        .into_iter()
        .map(|(field, at)| (field, json!(at)))
        .collect();
    let ready = ready_to_sample_at(&report, purge_start, settle_ms);

    let unstable_count: usize = annotations.values().map(Vec::len).sum();
    let unstable_minutes: serde_json::Map<String, serde_json::Value> = annotations
        .iter()
        .map(|(field, intervals)| {
            let total_ms: i64 = intervals.iter().map(|i| i.duration_ms()).sum();
            (field.clone(), json!(total_ms as f64 / 60_000.0))
        })
        .collect();
    logging::log_event(
        LogLevel::Info,
        LogSource::Annotation,
        well_id,
        &format!(
            "{} window(s), {} unstable interval(s), ready: {}",
            report.window_count(),
            unstable_count,
            ready.map_or_else(|| "no".to_string(), |t| t.to_string())
        ),
    );

    let output = json!({
        "well": well,
        "format": format.to_string(),
        "records": table.record_count(),
        "dropped_rows": normalized.dropped_rows,
        "diagnostics": normalized.diagnostics,
        "purge_start": purge_start,
        "window_minutes": config.stability.window_minutes,
        "settle_minutes": config.stability.settle_minutes,
        "stability": report,
        "annotations": annotations,
        "unstable_minutes": unstable_minutes,
        "stabilized_at": stable,
        "ready_to_sample_at": ready,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
