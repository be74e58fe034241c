/// In-Situ log record reader.
///
/// The decoded In-Situ log is a JSON envelope:
///
/// ```json
/// {
///   "attr": { "Device Model": "Aqua TROLL 600", "Site": "MW-3" },
///   "log_note": [ { "Date and Time": "...", "Note": "Manual Start" } ],
///   "log_data": [
///     { "Date and Time": "2023-05-01 15:00:00", "Temperature (C)": 14.9, ... }
///   ]
/// }
/// ```
///
/// Only `log_data` feeds the canonical table. Column labels come from the
/// keys of the first record, in document order, and are resolved with the
/// exact-or-stripped rule against
/// [`INSITU_RECORD_COLUMNS`](crate::registry::INSITU_RECORD_COLUMNS).

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Cell, ClockAdjustment, LogFormat, NormalizedLog};
use crate::model::{CanonicalTable, PurgeError};

/// One decoded In-Situ log file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InSituLog {
    /// Device and site attributes, kept verbatim.
    #[serde(default)]
    pub attr: Value,
    /// Operator notes recorded during the log, kept verbatim.
    #[serde(default)]
    pub log_note: Vec<Value>,
    pub log_data: Vec<Map<String, Value>>,
}

impl InSituLog {
    pub fn from_json(raw: &str) -> Result<InSituLog, PurgeError> {
        serde_json::from_str(raw).map_err(|e| PurgeError::ParseError(e.to_string()))
    }

    /// A string attribute from `attr`, e.g. `"Site"`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attr.get(key).and_then(Value::as_str)
    }
}

fn to_cell(value: Option<&Value>) -> Cell<'_> {
    match value {
        Some(Value::String(s)) => Cell::Text(s),
        Some(Value::Number(n)) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Missing),
        _ => Cell::Missing,
    }
}

/// Normalizes the `log_data` records of an In-Situ log.
pub fn normalize_records(
    log: &InSituLog,
    clock: ClockAdjustment,
) -> Result<NormalizedLog, PurgeError> {
    let format = LogFormat::InSituRecords;
    let first = log.log_data.first().ok_or(PurgeError::EmptyLog)?;
    let labels: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut diagnostics = Vec::new();
    let plans = super::plan_columns(&labels, format, &mut diagnostics)?;

    let mut table = CanonicalTable::new();
    for (i, record) in log.log_data.iter().enumerate() {
        let cells: Vec<Cell<'_>> = labels.iter().map(|label| to_cell(record.get(*label))).collect();
        super::push_record(&mut table, &plans, &cells, i + 1, format, clock)?;
    }

    Ok(NormalizedLog {
        table,
        diagnostics,
        dropped_rows: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Diagnostic;

    const SAMPLE: &str = r#"{
        "attr": { "Site": "MW-3", "Device Model": "Aqua TROLL 600" },
        "log_note": [ { "Note": "Manual Start" } ],
        "log_data": [
            {
                "Date and Time": "2023-05-01 15:00:00",
                "Temperature (C)": 14.9,
                "Barometric Pressure (mmHg)": 760.0,
                "pH(mV)": -42.5,
                "Specific Conductivity (mS/cm)": "0.8124",
                "Chlorophyll-a (RFU)": 0.2
            },
            {
                "Date and Time": "2023-05-01 15:00:30",
                "Temperature (C)": 14.8,
                "Barometric Pressure (mmHg)": 760.5,
                "pH(mV)": -42.1,
                "Specific Conductivity (mS/cm)": "0.8127",
                "Chlorophyll-a (RFU)": 0.3
            }
        ]
    }"#;

    #[test]
    fn test_envelope_decodes() {
        let log = InSituLog::from_json(SAMPLE).unwrap();
        assert_eq!(log.attribute("Site"), Some("MW-3"));
        assert_eq!(log.log_note.len(), 1);
        assert_eq!(log.log_data.len(), 2);
    }

    #[test]
    fn test_records_normalize_in_column_order() {
        let log = InSituLog::from_json(SAMPLE).unwrap();
        let out = normalize_records(&log, ClockAdjustment::UTC).unwrap();

        let fields: Vec<_> = out.table.fields().collect();
        assert_eq!(fields, vec!["datetime", "temp", "pres_baro", "ph_mv", "spcndct"]);
        assert_eq!(out.table.values("temp"), Some(&[14.9, 14.8][..]));
        assert_eq!(out.table.values("ph_mv"), Some(&[-42.5, -42.1][..]));

        let baro = out.table.values("pres_baro").unwrap();
        assert!((baro[0] - 760.0 / 51.7149).abs() < 1e-9);

        let spc = out.table.values("spcndct").unwrap();
        assert!((spc[0] - 812.4).abs() < 1e-9);
    }

    #[test]
    fn test_unmapped_record_column_is_reported() {
        let log = InSituLog::from_json(SAMPLE).unwrap();
        let out = normalize_records(&log, ClockAdjustment::UTC).unwrap();
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::UnmappedColumn {
                label: "Chlorophyll-a (RFU)".to_string()
            }]
        );
    }

    #[test]
    fn test_clock_adjustment_applied_to_records() {
        let log = InSituLog::from_json(SAMPLE).unwrap();
        let out = normalize_records(&log, ClockAdjustment::from_offset_minutes(-300)).unwrap();
        let utc = 1_682_953_200_000; // 2023-05-01T15:00:00Z
        assert_eq!(out.table.datetime().unwrap()[0], utc - 300 * 60 * 1000);
    }

    #[test]
    fn test_missing_value_in_later_record_is_nan() {
        let raw = r#"{ "log_data": [
            { "Date and Time": "2023-05-01 15:00:00", "Salinity (PSU)": 0.4 },
            { "Date and Time": "2023-05-01 15:00:30" }
        ] }"#;
        let out = normalize_records(&InSituLog::from_json(raw).unwrap(), ClockAdjustment::UTC)
            .unwrap();
        let sa = out.table.values("sa").unwrap();
        assert_eq!(sa.len(), 2);
        assert!(sa[1].is_nan());
    }

    #[test]
    fn test_unknown_unit_in_records_aborts() {
        let raw = r#"{ "log_data": [ { "Date and Time": "2023-05-01 15:00:00", "Pressure (kPa)": 101.2 } ] }"#;
        let result = normalize_records(&InSituLog::from_json(raw).unwrap(), ClockAdjustment::UTC);
        assert_eq!(result, Err(PurgeError::UnknownUnit("(kPa)".to_string())));
    }

    #[test]
    fn test_empty_log_data() {
        let raw = r#"{ "attr": {}, "log_note": [], "log_data": [] }"#;
        let result = normalize_records(&InSituLog::from_json(raw).unwrap(), ClockAdjustment::UTC);
        assert_eq!(result, Err(PurgeError::EmptyLog));
    }

    #[test]
    fn test_malformed_envelope() {
        assert!(matches!(
            InSituLog::from_json("{ not json"),
            Err(PurgeError::ParseError(_))
        ));
    }
}
