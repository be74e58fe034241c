//! Configuration for purge stability testing.
//!
//! [`PurgeConfig::load`] reads a TOML file; [`PurgeConfig::defaults`]
//! parses the embedded default document without touching the filesystem;
//! [`PurgeConfig::from_env`] picks the file named by `PURGEMON_CONFIG`
//! (after loading `.env`) and falls back to the defaults.
//!
//! A `[criteria]` table in a file replaces the default criteria entirely, so
//! a field can be dropped from testing by leaving it out.

use serde::Deserialize;
use std::path::Path;

use crate::alert::thresholds::CriteriaTable;
use crate::model::PurgeError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "PURGEMON_CONFIG";

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[stability]
window_minutes = 15
settle_minutes = 60

[criteria]
temp    = "0.2"
cndct   = "3%"
spcndct = "3%"
ph      = "0.1"
orp     = "50"
do_con  = "0.3"
do_sat  = "10%"
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PurgeConfig {
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default)]
    pub criteria: CriteriaTable,
}

/// `[stability]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StabilityConfig {
    /// Width of the rolling stability window.
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
    /// Time after purge start before instability is reported.
    #[serde(default = "default_settle_minutes")]
    pub settle_minutes: u32,
}

fn default_window_minutes() -> u32 { 15 }
fn default_settle_minutes() -> u32 { 60 }

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            settle_minutes: default_settle_minutes(),
        }
    }
}

impl StabilityConfig {
    pub fn window_ms(&self) -> i64 {
        i64::from(self.window_minutes) * 60_000
    }

    pub fn settle_ms(&self) -> i64 {
        i64::from(self.settle_minutes) * 60_000
    }
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            stability: StabilityConfig::default(),
            criteria: CriteriaTable::default(),
        }
    }
}

impl PurgeConfig {
    /// The built-in configuration.
    pub fn defaults() -> Self {
        // DEFAULT_CONFIG mirrors the Default impls
        Self::from_toml_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, PurgeError> {
        let config: PurgeConfig =
            toml::from_str(text).map_err(|e| PurgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, PurgeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PurgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Loads `.env`, then the file named by `PURGEMON_CONFIG` if set.
    pub fn from_env() -> Result<Self, PurgeError> {
        dotenv::dotenv().ok();
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim())),
            _ => Ok(Self::defaults()),
        }
    }

    fn validate(&self) -> Result<(), PurgeError> {
        if self.stability.window_minutes == 0 {
            return Err(PurgeError::Config(
                "stability.window_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::thresholds::Criterion;
    use std::io::Write;

    #[test]
    fn test_defaults_load() {
        let cfg = PurgeConfig::defaults();
        assert_eq!(cfg.stability.window_minutes, 15);
        assert_eq!(cfg.stability.settle_ms(), 3_600_000);
        assert_eq!(cfg.criteria, CriteriaTable::default());
    }

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        assert_eq!(PurgeConfig::from_toml_str(DEFAULT_CONFIG).unwrap(), PurgeConfig::default());
    }

    #[test]
    fn test_missing_sections_fall_back() {
        let cfg = PurgeConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, PurgeConfig::default());

        let cfg = PurgeConfig::from_toml_str("[stability]\nwindow_minutes = 5\n").unwrap();
        assert_eq!(cfg.stability.window_ms(), 300_000);
        assert_eq!(cfg.stability.settle_minutes, 60);
        assert_eq!(cfg.criteria.len(), 7);
    }

    #[test]
    fn test_criteria_table_replaces_defaults() {
        let cfg = PurgeConfig::from_toml_str("[criteria]\nph = \"0.05\"\nturbidity = \"10%\"\n")
            .unwrap();
        assert_eq!(cfg.criteria.len(), 2);
        assert_eq!(cfg.criteria.get("ph"), Some(&Criterion::absolute(0.05)));
        assert!(cfg.criteria.get("temp").is_none());
    }

    #[test]
    fn test_invalid_criterion_is_a_config_error() {
        let err = PurgeConfig::from_toml_str("[criteria]\nph = \"steady\"\n").unwrap_err();
        assert!(matches!(err, PurgeError::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = PurgeConfig::from_toml_str("[stability]\nwindow_minutes = 0\n").unwrap_err();
        assert!(matches!(err, PurgeError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[stability]\nwindow_minutes = 10\nsettle_minutes = 30").unwrap();
        let cfg = PurgeConfig::load(file.path()).unwrap();
        assert_eq!(cfg.stability.window_minutes, 10);
        assert_eq!(cfg.stability.settle_ms(), 1_800_000);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PurgeConfig::load(Path::new("/nonexistent/purgemon.toml")).unwrap_err();
        assert!(matches!(err, PurgeError::Config(_)));
    }
}
