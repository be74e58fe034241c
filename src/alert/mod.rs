//! Stability criteria and unstable-interval annotation.
//!
//! - `thresholds` - criterion parsing and the per-window margin checks.
//! - `intervals`  - turns pass/fail flags into chart annotation spans and
//!   readiness times.

pub mod intervals;
pub mod thresholds;

pub use intervals::{ready_to_sample_at, stabilized_at, unstable_intervals, unstable_intervals_after};
pub use thresholds::{CriteriaTable, Criterion, MarginKind};
