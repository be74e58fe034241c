//! Groundwater well-purge monitoring.
//!
//! Field technicians purge a monitoring well until the water chemistry read
//! by a multiparameter sonde settles. This crate turns the sonde's log into a
//! canonical time series, tests it for stability over rolling windows and
//! extracts the spans during which each parameter was still drifting, for
//! shading on the purge chart.
//!
//! Pipeline:
//! 1. [`ingest::normalize`] - raw CSV export or In-Situ record set into a
//!    [`model::CanonicalTable`]
//! 2. [`analysis::test_stability`] - per-window pass/fail flags
//! 3. [`alert::unstable_intervals`] - unstable spans after the settle period

pub mod alert;
pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod registry;

pub use alert::{CriteriaTable, Criterion, unstable_intervals, unstable_intervals_after};
pub use analysis::test_stability;
pub use config::PurgeConfig;
pub use ingest::{ClockAdjustment, LogFormat, NormalizedLog, normalize};
pub use model::{Annotations, CanonicalTable, PurgeError, StabilityReport, UnstableInterval};
