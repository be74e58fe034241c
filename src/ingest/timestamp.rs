/// Timestamp parsing for instrument logs.
///
/// Instruments write their clocks in UTC but the canonical table carries
/// local wall-clock time, so every parsed instant is shifted by a
/// [`ClockAdjustment`]. The adjustment is passed in rather than read from
/// the system inside the parser, which keeps normalization deterministic in
/// tests.

use chrono::{DateTime, Local, NaiveDateTime, Offset, Utc};

/// Naive layouts seen in instrument exports, tried in order. Naive values are
/// read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset applied to every parsed instrument timestamp.
///
/// `local_minus_utc_ms` is positive east of Greenwich. The canonical time is
/// `parsed_utc_ms + local_minus_utc_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockAdjustment {
    pub local_minus_utc_ms: i64,
}

impl ClockAdjustment {
    /// No shift: canonical time equals the instrument's UTC time.
    pub const UTC: ClockAdjustment = ClockAdjustment { local_minus_utc_ms: 0 };

    pub fn from_offset_minutes(minutes: i64) -> Self {
        Self {
            local_minus_utc_ms: minutes.saturating_mul(60 * 1000),
        }
    }

    /// The host's current UTC offset.
    pub fn local() -> Self {
        let seconds = Local::now().offset().fix().local_minus_utc();
        Self {
            local_minus_utc_ms: i64::from(seconds) * 1000,
        }
    }

    /// Shifts a UTC instant onto the reference clock. `None` when the result
    /// falls outside the range chrono can represent.
    pub fn apply(&self, utc_ms: i64) -> Option<i64> {
        utc_ms
            .checked_add(self.local_minus_utc_ms)
            .filter(|&ms| DateTime::<Utc>::from_timestamp_millis(ms).is_some())
    }
}

/// Epoch milliseconds from a numeric timestamp cell.
///
/// Fractional milliseconds are truncated. Returns `None` for non-finite
/// values and instants outside chrono's range.
pub fn millis_from_number(value: f64) -> Option<i64> {
    if !value.is_finite() || value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(value as i64).map(|dt| dt.timestamp_millis())
}

/// Parses an instrument timestamp into UTC epoch milliseconds.
///
/// Accepts RFC 3339 with an explicit offset and the naive layouts in
/// [`NAIVE_FORMATS`]. Returns `None` when nothing fits.
pub fn parse_utc_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Inserts the space chrono's `%p` needs before a trailing `AM`/`PM`.
///
/// The CSV export writes `"05/01/2023 10:15:00AM"`.
pub fn separate_meridiem(raw: &str) -> String {
    let trimmed = raw.trim();
    for suffix in ["AM", "PM", "am", "pm"] {
        if let Some(head) = trimmed.strip_suffix(suffix) {
            if !head.is_empty() && !head.ends_with(' ') {
                return format!("{} {}", head, suffix);
            }
        }
    }
    trimmed.to_string()
}
