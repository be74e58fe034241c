/// Structured logging for the purge monitoring service
///
/// Installs a `tracing` subscriber and provides context-rich helpers that
/// tag events with their log source and well identifier. Library modules
/// emit `tracing` events directly; the helpers here cover the per-log
/// summaries and failure reporting done by the front end.

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::ingest::{LogFormat, NormalizedLog};
use crate::model::PurgeError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Log Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Csv,
    InSitu,
    Stability,
    Annotation,
    System,
}

impl From<LogFormat> for LogSource {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::CsvExport => LogSource::Csv,
            LogFormat::InSituRecords => LogSource::InSitu,
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Csv => write!(f, "CSV"),
            LogSource::InSitu => write!(f, "INSITU"),
            LogSource::Stability => write!(f, "STAB"),
            LogSource::Annotation => write!(f, "ANNOT"),
            LogSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - truncated or empty download, wrong file picked
    Expected,
    /// Unexpected failure - instrument configuration or firmware change
    Unexpected,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
        }
    }
}

/// Classify a normalization or analysis failure.
///
/// An unknown unit or unreadable timestamp means the instrument is writing
/// something the registries do not know about and needs attention.
pub fn classify_failure(err: &PurgeError) -> FailureType {
    match err {
        PurgeError::UnknownUnit(_)
        | PurgeError::InvalidTimestamp { .. }
        | PurgeError::InvalidCriterion(_)
        | PurgeError::Config(_) => FailureType::Unexpected,
        PurgeError::EmptyLog
        | PurgeError::MissingField(_)
        | PurgeError::InvalidWindow(_)
        | PurgeError::ParseError(_)
        | PurgeError::UnsupportedFormat(_) => FailureType::Expected,
    }
}

// ---------------------------------------------------------------------------
// Logger Setup
// ---------------------------------------------------------------------------

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `min_level` when set. With `log_file` events are
/// appended to that file instead of stderr. Calling this twice keeps the
/// first subscriber.
pub fn init_logger(
    min_level: LogLevel,
    log_file: Option<&str>,
    console_timestamps: bool,
) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.as_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match (log_file, console_timestamps) {
        (Some(path), _) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
        (None, true) => builder.with_writer(std::io::stderr).try_init(),
        (None, false) => builder
            .without_time()
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Logger already initialized");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Emit `message` at `level`, tagged with its source and well.
pub fn log_event(level: LogLevel, source: LogSource, well_id: Option<&str>, message: &str) {
    let well = well_id.unwrap_or("-");
    match level {
        LogLevel::Debug => tracing::debug!(source = %source, well, "{}", message),
        LogLevel::Info => tracing::info!(source = %source, well, "{}", message),
        LogLevel::Warning => tracing::warn!(source = %source, well, "{}", message),
        LogLevel::Error => tracing::error!(source = %source, well, "{}", message),
    }
}

/// Log a normalization failure with automatic classification
pub fn log_normalize_failure(source: LogSource, well_id: Option<&str>, operation: &str, err: &PurgeError) {
    let failure_type = classify_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => log_event(LogLevel::Warning, source, well_id, &message),
        FailureType::Unexpected => log_event(LogLevel::Error, source, well_id, &message),
    }
}

/// Level for a normalization summary: anything skipped is worth a warning.
pub fn summary_level(log: &NormalizedLog) -> LogLevel {
    if log.table.record_count() == 0 {
        LogLevel::Error
    } else if log.diagnostics.is_empty() {
        LogLevel::Info
    } else {
        LogLevel::Warning
    }
}

/// Log a summary of one normalized log
pub fn log_normalize_summary(source: LogSource, well_id: Option<&str>, log: &NormalizedLog) {
    let unmapped = log.unmapped_columns().count();
    let message = format!(
        "Normalized {} record(s) into {} field(s), {} unmapped column(s), {} dropped row(s)",
        log.table.record_count(),
        log.table.fields().count(),
        unmapped,
        log.dropped_rows
    );
    log_event(summary_level(log), source, well_id, &message);
    for diagnostic in &log.diagnostics {
        log_event(LogLevel::Debug, source, well_id, &diagnostic.to_string());
    }
}
