/// Aqua TROLL CSV export reader.
///
/// The export is a bare header line followed by one comma-separated row per
/// sample:
///
/// ```text
/// Date/Time,Temp (C),SPCNDCT (µS/cm),pH (pH)
/// 05/01/2023 10:15:00AM,14.92,812.4,6.88
/// ```
///
/// Labels are resolved with the prefix rule against
/// [`CSV_EXPORT_COLUMNS`](crate::registry::CSV_EXPORT_COLUMNS). Rows whose
/// token count differs from the header are dropped: field dumps regularly
/// end in a truncated line.

use super::{Cell, ClockAdjustment, LogFormat, NormalizedLog};
use crate::model::{CanonicalTable, Diagnostic, PurgeError};

/// Splits one line into trimmed tokens, dropping surrounding quotes.
fn tokenize(line: &str) -> Vec<&str> {
    line.split(',')
        .map(|token| token.trim().trim_matches('"'))
        .collect()
}

/// Normalizes CSV export text into a canonical table.
pub fn normalize_csv(raw: &str, clock: ClockAdjustment) -> Result<NormalizedLog, PurgeError> {
    let format = LogFormat::CsvExport;
    let mut lines = raw.lines();

    let header = lines
        .by_ref()
        .map(|line| line.trim_start_matches('\u{feff}'))
        .find(|line| !line.trim().is_empty())
        .ok_or(PurgeError::EmptyLog)?;
    let labels = tokenize(header);

    let mut diagnostics = Vec::new();
    let plans = super::plan_columns(&labels, format, &mut diagnostics)?;

    let mut table = CanonicalTable::new();
    let mut row = 0usize;
    let mut dropped = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        row += 1;

        let tokens = tokenize(line);
        if tokens.len() != labels.len() {
            dropped += 1;
            continue; // Skip truncated or corrupted rows
        }

        let cells: Vec<Cell<'_>> = tokens.into_iter().map(Cell::Text).collect();
        super::push_record(&mut table, &plans, &cells, row, format, clock)?;
    }

    if dropped > 0 {
        tracing::debug!(format = %format, "Dropped {} malformed row(s) of {}", dropped, row);
        diagnostics.push(Diagnostic::DroppedRows { count: dropped });
    }

    Ok(NormalizedLog {
        table,
        diagnostics,
        dropped_rows: dropped,
    })
}
