/// Instrument log ingestion.
///
/// Both supported log formats go through the same pipeline: resolve each raw
/// column label to a canonical field and unit scale, then walk the records
/// and fill a [`CanonicalTable`]. The formats only differ in how raw rows are
/// tokenized ([`csv_log`], [`insitu`]) and in which registry and matching
/// rule resolve their labels ([`LogFormat`]).
///
/// Submodules:
/// - `csv_log`   - Aqua TROLL delimited-text export.
/// - `insitu`    - In-Situ record envelope (`attr` / `log_note` / `log_data`).
/// - `timestamp` - timestamp layouts and the UTC → local clock shift.

pub mod csv_log;
pub mod insitu;
pub mod timestamp;

use std::path::Path;

use crate::model::{CanonicalTable, Diagnostic, FIELD_DATETIME, PurgeError};
use crate::registry::{self, ColumnMapping, MatchRule};
pub use timestamp::ClockAdjustment;

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// The instrument log formats this service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Comma-separated export: one header line, one row per line.
    CsvExport,
    /// Decoded In-Situ record set: one key → value map per record.
    InSituRecords,
}

impl LogFormat {
    /// Picks a format from a file extension, as the upload endpoint did.
    pub fn from_path(path: &Path) -> Result<LogFormat, PurgeError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(LogFormat::CsvExport),
            "json" => Ok(LogFormat::InSituRecords),
            _ => Err(PurgeError::UnsupportedFormat(ext)),
        }
    }

    pub fn registry(self) -> &'static [ColumnMapping] {
        match self {
            LogFormat::CsvExport => registry::CSV_EXPORT_COLUMNS,
            LogFormat::InSituRecords => registry::INSITU_RECORD_COLUMNS,
        }
    }

    pub fn match_rule(self) -> MatchRule {
        match self {
            LogFormat::CsvExport => MatchRule::Prefix,
            LogFormat::InSituRecords => MatchRule::ExactOrStripped,
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::CsvExport => write!(f, "CSV"),
            LogFormat::InSituRecords => write!(f, "INSITU"),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalizer output
// ---------------------------------------------------------------------------

/// Result of normalizing one log.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLog {
    pub table: CanonicalTable,
    /// Non-fatal findings: unmapped or duplicate columns, dropped rows.
    pub diagnostics: Vec<Diagnostic>,
    /// Rows dropped for having the wrong token count (CSV only).
    pub dropped_rows: usize,
}

impl NormalizedLog {
    pub fn unmapped_columns(&self) -> impl Iterator<Item = &str> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::UnmappedColumn { label } => Some(label.as_str()),
            _ => None,
        })
    }
}

/// Normalizes `raw` log content of the declared `format`.
///
/// `raw` is the file text: CSV content for [`LogFormat::CsvExport`], the JSON
/// record envelope for [`LogFormat::InSituRecords`].
pub fn normalize(
    raw: &str,
    format: LogFormat,
    clock: ClockAdjustment,
) -> Result<NormalizedLog, PurgeError> {
    match format {
        LogFormat::CsvExport => csv_log::normalize_csv(raw, clock),
        LogFormat::InSituRecords => {
            let log = insitu::InSituLog::from_json(raw)?;
            insitu::normalize_records(&log, clock)
        }
    }
}

// ---------------------------------------------------------------------------
// Shared pipeline
// ---------------------------------------------------------------------------

/// Where one raw column's values go.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnPlan {
    /// Canonical field, or empty for a skipped column.
    pub field: String,
    pub scale: f64,
}

impl ColumnPlan {
    fn skipped() -> Self {
        Self {
            field: String::new(),
            scale: 0.0,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.field.is_empty()
    }
}

/// A raw cell handed to the table builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Missing,
}

/// Resolves every raw label to a [`ColumnPlan`], one plan per label, in
/// label order.
///
/// Fails on the first matched column whose unit suffix is unknown.
pub(crate) fn plan_columns<S: AsRef<str>>(
    labels: &[S],
    format: LogFormat,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<ColumnPlan>, PurgeError> {
    let mut plans: Vec<ColumnPlan> = Vec::with_capacity(labels.len());

    for label in labels {
        let label = label.as_ref();
        let Some((entry, unit)) =
            registry::match_column(format.registry(), format.match_rule(), label)
        else {
            tracing::warn!(format = %format, "Unknown column name: {}", label);
            diagnostics.push(Diagnostic::UnmappedColumn {
                label: label.to_string(),
            });
            plans.push(ColumnPlan::skipped());
            continue;
        };

        let scale = registry::unit_scale(unit).inspect_err(|_| {
            tracing::error!(format = %format, column = label, "Unknown unit: {}", unit);
        })?;

        if plans.iter().any(|p| p.field == entry.field) {
            tracing::warn!(
                format = %format,
                "Column '{}' duplicates field '{}', skipping",
                label,
                entry.field
            );
            diagnostics.push(Diagnostic::DuplicateField {
                label: label.to_string(),
                field: entry.field.to_string(),
            });
            plans.push(ColumnPlan::skipped());
            continue;
        }

        plans.push(ColumnPlan {
            field: entry.field.to_string(),
            scale,
        });
    }

    Ok(plans)
}

/// Appends one record to `table`. `row` is the 1-based data row used in
/// error messages.
pub(crate) fn push_record(
    table: &mut CanonicalTable,
    plans: &[ColumnPlan],
    cells: &[Cell<'_>],
    row: usize,
    format: LogFormat,
    clock: ClockAdjustment,
) -> Result<(), PurgeError> {
    for (plan, cell) in plans.iter().zip(cells) {
        if plan.is_skipped() {
            continue;
        }
        if plan.field == FIELD_DATETIME {
            table.push_timestamp(parse_timestamp_cell(cell, row, format, clock)?);
        } else {
            table.push_value(&plan.field, parse_value_cell(cell, &plan.field, row) * plan.scale);
        }
    }
    Ok(())
}

/// Parses a `datetime` cell and shifts it onto the reference clock. Values
/// that cannot be represented after the shift are rejected like unreadable
/// ones.
fn parse_timestamp_cell(
    cell: &Cell<'_>,
    row: usize,
    format: LogFormat,
    clock: ClockAdjustment,
) -> Result<i64, PurgeError> {
    let parsed = match cell {
        Cell::Text(text) if format == LogFormat::CsvExport => {
            timestamp::parse_utc_millis(&timestamp::separate_meridiem(text))
        }
        Cell::Text(text) => timestamp::parse_utc_millis(text),
        Cell::Number(n) => timestamp::millis_from_number(*n),
        Cell::Missing => None,
    };

    parsed.and_then(|utc| clock.apply(utc)).ok_or_else(|| PurgeError::InvalidTimestamp {
        row,
        value: match cell {
            Cell::Text(text) => text.to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Missing => String::new(),
        },
    })
}

/// Unreadable cells become NaN so the column stays aligned with `datetime`.
fn parse_value_cell(cell: &Cell<'_>, field: &str, row: usize) -> f64 {
    let value = match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(text) => text.trim().parse::<f64>().ok(),
        Cell::Missing => None,
    };
    value.unwrap_or_else(|| {
        tracing::debug!(field, row, "Unreadable value {:?}, storing NaN", cell);
        f64::NAN
    })
}
