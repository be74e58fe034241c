/// Core data types for the well purge monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// the canonical table produced by the normalizer, the pass/fail report
/// produced by the stability tester, the unstable intervals produced for
/// chart annotation, and the crate-wide error type.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Canonical field names
// ---------------------------------------------------------------------------

/// Canonical name of the timestamp column (epoch milliseconds).
pub const FIELD_DATETIME: &str = "datetime";

/// Water temperature, °C.
pub const FIELD_TEMP: &str = "temp";

/// Actual conductivity, µS/cm.
pub const FIELD_CNDCT: &str = "cndct";

/// Specific conductivity, µS/cm.
pub const FIELD_SPCNDCT: &str = "spcndct";

/// pH, pH units.
pub const FIELD_PH: &str = "ph";

/// Oxidation reduction potential, mV.
pub const FIELD_ORP: &str = "orp";

/// Dissolved oxygen concentration, mg/L.
pub const FIELD_DO_CON: &str = "do_con";

/// Dissolved oxygen saturation, %sat.
pub const FIELD_DO_SAT: &str = "do_sat";

/// Delay between the start of purging and the first moment an unstable
/// interval may be reported: one hour, in milliseconds.
pub const PURGE_SETTLE_MS: i64 = 3_600_000;

// ---------------------------------------------------------------------------
// Canonical table
// ---------------------------------------------------------------------------

/// Values of one canonical column.
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    /// Epoch milliseconds on the reference clock (only used for `datetime`).
    Timestamps(Vec<i64>),
    /// Measurements in the canonical unit of the field.
    Values(Vec<f64>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Timestamps(v) => v.len(),
            Series::Values(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Series::Timestamps(v) => v.serialize(serializer),
            Series::Values(v) => v.serialize(serializer),
        }
    }
}

/// A normalized instrument log: canonical field name → ordered series.
///
/// Columns appear in the order they were first filled while iterating the
/// source records. Record order is the instrument's order and is never
/// re-sorted. Each series holds one entry per record that contributed to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalTable {
    columns: Vec<(String, Series)>,
}

impl CanonicalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper: set the `datetime` column.
    pub fn with_timestamps(mut self, timestamps: Vec<i64>) -> Self {
        self.set(FIELD_DATETIME, Series::Timestamps(timestamps));
        self
    }

    /// Builder-style helper: set a measurement column.
    pub fn with_values(mut self, field: &str, values: Vec<f64>) -> Self {
        self.set(field, Series::Values(values));
        self
    }

    fn set(&mut self, field: &str, series: Series) {
        match self.columns.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = series,
            None => self.columns.push((field.to_string(), series)),
        }
    }

    /// Append a timestamp to `datetime`, creating the column on first use.
    pub(crate) fn push_timestamp(&mut self, epoch_ms: i64) {
        match self.columns.iter_mut().find(|(name, _)| name == FIELD_DATETIME) {
            Some((_, Series::Timestamps(v))) => v.push(epoch_ms),
            Some((_, other)) => *other = Series::Timestamps(vec![epoch_ms]),
            None => self
                .columns
                .push((FIELD_DATETIME.to_string(), Series::Timestamps(vec![epoch_ms]))),
        }
    }

    /// Append a measurement to `field`, creating the column on first use.
    pub(crate) fn push_value(&mut self, field: &str, value: f64) {
        match self.columns.iter_mut().find(|(name, _)| name == field) {
            Some((_, Series::Values(v))) => v.push(value),
            Some((_, other)) => *other = Series::Values(vec![value]),
            None => self
                .columns
                .push((field.to_string(), Series::Values(vec![value]))),
        }
    }

    /// The `datetime` column, if present.
    pub fn datetime(&self) -> Option<&[i64]> {
        self.get(FIELD_DATETIME).and_then(|s| match s {
            Series::Timestamps(v) => Some(v.as_slice()),
            Series::Values(_) => None,
        })
    }

    /// A measurement column, if present. Returns `None` for `datetime`.
    pub fn values(&self, field: &str) -> Option<&[f64]> {
        self.get(field).and_then(|s| match s {
            Series::Values(v) => Some(v.as_slice()),
            Series::Timestamps(_) => None,
        })
    }

    pub fn get(&self, field: &str) -> Option<&Series> {
        self.columns
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, series)| series)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Field names in column order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.columns.iter().map(|(name, series)| (name.as_str(), series))
    }

    /// Number of records, taken from `datetime` when present.
    pub fn record_count(&self) -> usize {
        match self.datetime() {
            Some(dt) => dt.len(),
            None => self.columns.iter().map(|(_, s)| s.len()).max().unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for CanonicalTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, series) in &self.columns {
            map.serialize_entry(name, series)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Stability results
// ---------------------------------------------------------------------------

/// Output of the stability window tester.
///
/// `datetime[i]` is the right edge of window `i`; `results[field][i]` is
/// whether `field` passed its criterion over that window. Serializes as one
/// flat object: `{"datetime": [...], "temp": [true, ...], ...}`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct StabilityReport {
    pub datetime: Vec<i64>,
    #[serde(flatten)]
    pub results: BTreeMap<String, Vec<bool>>,
}

impl StabilityReport {
    pub fn window_count(&self) -> usize {
        self.datetime.len()
    }

    pub fn tested_fields(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }
}

/// A closed span `[start, end]` (epoch ms) during which a field was judged
/// unstable. Serializes as `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(into = "(i64, i64)")]
pub struct UnstableInterval {
    pub start: i64,
    pub end: i64,
}

impl From<UnstableInterval> for (i64, i64) {
    fn from(interval: UnstableInterval) -> Self {
        (interval.start, interval.end)
    }
}

impl UnstableInterval {
    pub fn duration_ms(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// Per-field unstable intervals, ready for chart annotation.
pub type Annotations = BTreeMap<String, Vec<UnstableInterval>>;

// ---------------------------------------------------------------------------
// Normalizer diagnostics
// ---------------------------------------------------------------------------

/// Non-fatal findings surfaced to the caller of the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A raw column label matched no registry entry; its values were skipped.
    UnmappedColumn { label: String },
    /// A raw column resolved to a field already claimed by an earlier column;
    /// its values were skipped.
    DuplicateField { label: String, field: String },
    /// Delimited-text rows whose token count did not match the header.
    DroppedRows { count: usize },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnmappedColumn { label } => write!(f, "Unknown column name: {}", label),
            Diagnostic::DuplicateField { label, field } => {
                write!(f, "Column '{}' duplicates field '{}'", label, field)
            }
            Diagnostic::DroppedRows { count } => write!(f, "Dropped {} malformed row(s)", count),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while normalizing a log or running the stability test.
#[derive(Debug, Clone, PartialEq)]
pub enum PurgeError {
    /// A matched column carried a unit suffix with no registry entry.
    UnknownUnit(String),
    /// A `datetime` cell could not be parsed (1-based data row).
    InvalidTimestamp { row: usize, value: String },
    /// The log had no header or no records.
    EmptyLog,
    /// A field required by the operation is absent from the table.
    MissingField(String),
    /// Window width must be a positive number of milliseconds.
    InvalidWindow(i64),
    /// A criterion string is not a number or a percentage.
    InvalidCriterion(String),
    /// The structured log envelope could not be decoded.
    ParseError(String),
    /// The file extension does not name a supported log format.
    UnsupportedFormat(String),
    /// The configuration could not be read or parsed.
    Config(String),
}

impl std::fmt::Display for PurgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurgeError::UnknownUnit(unit) => write!(f, "Unknown unit: {}", unit),
            PurgeError::InvalidTimestamp { row, value } => {
                write!(f, "Invalid timestamp on row {}: '{}'", row, value)
            }
            PurgeError::EmptyLog => write!(f, "Log contains no records"),
            PurgeError::MissingField(field) => write!(f, "Missing field: {}", field),
            PurgeError::InvalidWindow(width) => {
                write!(f, "Window width must be positive, got {} ms", width)
            }
            PurgeError::InvalidCriterion(raw) => write!(f, "Invalid criterion: '{}'", raw),
            PurgeError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PurgeError::UnsupportedFormat(ext) => write!(f, "Unsupported log format: {}", ext),
            PurgeError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for PurgeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_keep_first_occurrence_order() {
        let mut table = CanonicalTable::new();
        table.push_value("temp", 20.0);
        table.push_timestamp(1_000);
        table.push_value("ph", 7.0);
        table.push_value("temp", 21.0);

        let fields: Vec<_> = table.fields().collect();
        assert_eq!(fields, vec!["temp", "datetime", "ph"]);
        assert_eq!(table.values("temp"), Some(&[20.0, 21.0][..]));
        assert_eq!(table.datetime(), Some(&[1_000][..]));
    }

    #[test]
    fn test_datetime_is_not_a_value_column() {
        let table = CanonicalTable::new().with_timestamps(vec![1, 2, 3]);
        assert!(table.values(FIELD_DATETIME).is_none());
        assert_eq!(table.record_count(), 3);
    }

    #[test]
    fn test_table_serializes_as_ordered_map() {
        let table = CanonicalTable::new()
            .with_timestamps(vec![1_672_531_200_000])
            .with_values("temp", vec![20.0])
            .with_values("ph", vec![7.0]);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"datetime":[1672531200000],"temp":[20.0],"ph":[7.0]}"#);
    }

    #[test]
    fn test_interval_serializes_as_pair() {
        let interval = UnstableInterval { start: 10, end: 20 };
        assert_eq!(serde_json::to_string(&interval).unwrap(), "[10,20]");
        assert_eq!(interval.duration_ms(), 10);
    }

    #[test]
    fn test_report_serializes_flat() {
        let mut report = StabilityReport {
            datetime: vec![5, 6],
            ..Default::default()
        };
        report.results.insert("ph".to_string(), vec![false, true]);
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"datetime":[5,6],"ph":[false,true]}"#);
    }

    #[test]
    fn test_error_display() {
        let err = PurgeError::UnknownUnit("(kPa)".to_string());
        assert_eq!(err.to_string(), "Unknown unit: (kPa)");
    }
}
