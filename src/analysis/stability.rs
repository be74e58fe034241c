/// Stability window tester.
///
/// Runs every criterion in a [`CriteriaTable`] over the rolling windows of a
/// canonical table and returns one pass/fail flag per field per window,
/// aligned with the window-closing timestamps.

use super::windows::rolling_windows;
use crate::alert::thresholds::CriteriaTable;
use crate::model::{CanonicalTable, FIELD_DATETIME, PurgeError, StabilityReport};

/// Tests `table` for stability over windows `width_ms` wide.
///
/// The table's `datetime` column must be sorted ascending (the caller's
/// responsibility). Criteria naming a field the table lacks are skipped, as
/// are fields whose length differs from `datetime`; fields without a
/// criterion are never tested.
pub fn test_stability(
    table: &CanonicalTable,
    width_ms: i64,
    criteria: &CriteriaTable,
) -> Result<StabilityReport, PurgeError> {
    if width_ms <= 0 {
        return Err(PurgeError::InvalidWindow(width_ms));
    }
    let datetime = table
        .datetime()
        .ok_or_else(|| PurgeError::MissingField(FIELD_DATETIME.to_string()))?;

    let windows = rolling_windows(datetime, width_ms);
    let mut report = StabilityReport {
        datetime: windows.iter().map(|w| datetime[w.right]).collect(),
        ..Default::default()
    };

    for (field, criterion) in criteria.iter() {
        let Some(values) = table.values(field) else {
            tracing::debug!(field, "No data for criterion, skipping");
            continue;
        };
        if values.len() != datetime.len() {
            tracing::warn!(
                field,
                "Series has {} values but datetime has {}, skipping",
                values.len(),
                datetime.len()
            );
            continue;
        }

        let flags = windows
            .iter()
            .map(|w| criterion.passes(w.slice(values)))
            .collect();
        report.results.insert(field.to_string(), flags);
    }

    tracing::debug!(
        windows = report.window_count(),
        fields = report.results.len(),
        "Stability test complete"
    );
    Ok(report)
}
