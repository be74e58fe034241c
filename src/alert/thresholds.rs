//! Stability criteria and the per-window pass/fail checks.
//!
//! A criterion is written the way field staff write it on the purge form:
//! `"0.1"` is an absolute margin in the field's canonical unit, `"3%"` is a
//! margin relative to the window mean. A window passes when neither the
//! maximum nor the minimum strays from the window mean by the margin or more.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{
    FIELD_CNDCT, FIELD_DO_CON, FIELD_DO_SAT, FIELD_ORP, FIELD_PH, FIELD_SPCNDCT, FIELD_TEMP,
    PurgeError,
};

/// Whether a margin is in field units or a fraction of the window mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginKind {
    Absolute,
    Relative,
}

/// Tolerance for one field.
///
/// For [`MarginKind::Relative`] the margin is stored as a fraction, so
/// `"3%"` becomes `0.03`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Criterion {
    pub kind: MarginKind,
    pub margin: f64,
}

impl Criterion {
    pub const fn absolute(margin: f64) -> Self {
        Self {
            kind: MarginKind::Absolute,
            margin,
        }
    }

    /// `percent` is in percent: `relative(3.0)` is `"3%"`.
    pub fn relative(percent: f64) -> Self {
        Self {
            kind: MarginKind::Relative,
            margin: percent / 100.0,
        }
    }

    /// Whether `window` is stable under this criterion.
    ///
    /// An empty window never passes. A relative test over a window whose
    /// mean is zero (or whose values include NaN) produces a non-finite
    /// ratio and fails.
    pub fn passes(&self, window: &[f64]) -> bool {
        let Some(stats) = WindowStats::of(window) else {
            return false;
        };
        match self.kind {
            MarginKind::Absolute => passes_absolute(&stats, self.margin),
            MarginKind::Relative => passes_relative(&stats, self.margin),
        }
    }
}

impl FromStr for Criterion {
    type Err = PurgeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim();
        let invalid = || PurgeError::InvalidCriterion(raw.to_string());

        let (number, kind) = match text.strip_suffix('%') {
            Some(head) => (head.trim(), MarginKind::Relative),
            None => (text, MarginKind::Absolute),
        };
        let value: f64 = number.parse().map_err(|_| invalid())?;
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid());
        }

        Ok(match kind {
            MarginKind::Absolute => Criterion::absolute(value),
            MarginKind::Relative => Criterion::relative(value),
        })
    }
}

impl TryFrom<String> for Criterion {
    type Error = PurgeError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Criterion> for String {
    fn from(c: Criterion) -> Self {
        c.to_string()
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            MarginKind::Absolute => write!(f, "{}", self.margin),
            MarginKind::Relative => write!(f, "{}%", self.margin * 100.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Window statistics
// ---------------------------------------------------------------------------

/// Min, max and mean of one window. NaN inputs make the mean NaN, which
/// fails every comparison below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl WindowStats {
    pub fn of(window: &[f64]) -> Option<Self> {
        if window.is_empty() {
            return None;
        }
        let min = window.iter().copied().fold(f64::INFINITY, f64::min);
        let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        Some(Self { min, max, mean })
    }
}

/// Passes iff `max - mean < margin` and `mean - min < margin`.
pub fn passes_absolute(stats: &WindowStats, margin: f64) -> bool {
    stats.max - stats.mean < margin && stats.mean - stats.min < margin
}

/// Passes iff both deviations divided by the mean are below `margin`.
pub fn passes_relative(stats: &WindowStats, margin: f64) -> bool {
    let upper = (stats.max - stats.mean) / stats.mean;
    let lower = (stats.mean - stats.min) / stats.mean;
    if !upper.is_finite() || !lower.is_finite() {
        return false;
    }
    upper < margin && lower < margin
}

// ---------------------------------------------------------------------------
// Criteria table
// ---------------------------------------------------------------------------

/// Field name → criterion. Only fields listed here are tested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriteriaTable {
    entries: BTreeMap<String, Criterion>,
}

impl CriteriaTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, field: &str, criterion: Criterion) -> Option<Criterion> {
        self.entries.insert(field.to_string(), criterion)
    }

    pub fn with(mut self, field: &str, criterion: Criterion) -> Self {
        self.insert(field, criterion);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Criterion> {
        self.entries.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Purge stabilization criteria used unless configuration overrides them.
impl Default for CriteriaTable {
    fn default() -> Self {
        CriteriaTable::empty()
            .with(FIELD_TEMP, Criterion::absolute(0.2))
            .with(FIELD_CNDCT, Criterion::relative(3.0))
            .with(FIELD_SPCNDCT, Criterion::relative(3.0))
            .with(FIELD_PH, Criterion::absolute(0.1))
            .with(FIELD_ORP, Criterion::absolute(50.0))
            .with(FIELD_DO_CON, Criterion::absolute(0.3))
            .with(FIELD_DO_SAT, Criterion::relative(10.0))
    }
}
