//! Run configuration.
//!
//! One explicit [`RunConfig`] structure is loaded up front and passed into
//! the orchestrator — there is no process-wide mutable state. Values come
//! from an optional `photoshrink.toml` overlaid by CLI flags.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [budget]
//! mode = "max-bytes"        # "max-bytes" or "max-pixels"
//! value = 25165824          # bytes (or pixels) — default is 24 MiB,
//!                           # round(0.95 × 25) MB like the original tool
//!
//! [reducer]
//! shrink_ratio = 1.2        # linear shrink per attempt (must be > 1.0)
//! max_attempts = 100        # iteration cap before BudgetUnreachable
//! min_dimension = 1         # floor for either axis
//! quality = 90              # JPEG quality (1-100), measurement and output
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Config files are sparse — override just the values you want. Unknown
//! keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full configuration for one batch run.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Size ceiling reduced images must satisfy.
    pub budget: BudgetConfig,
    /// Reduction loop parameters.
    pub reducer: ReducerSettings,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl RunConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget.value == 0 {
            return Err(ConfigError::Validation(
                "budget.value must be positive".into(),
            ));
        }
        if self.reducer.shrink_ratio <= 1.0 {
            return Err(ConfigError::Validation(
                "reducer.shrink_ratio must be greater than 1.0".into(),
            ));
        }
        if self.reducer.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "reducer.max_attempts must be at least 1".into(),
            ));
        }
        if self.reducer.min_dimension == 0 {
            return Err(ConfigError::Validation(
                "reducer.min_dimension must be at least 1".into(),
            ));
        }
        if self.reducer.quality == 0 || self.reducer.quality > 100 {
            return Err(ConfigError::Validation(
                "reducer.quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

/// Which ceiling the reducer enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetMode {
    /// `value` is a maximum encoded byte count.
    MaxBytes,
    /// `value` is a maximum pixel count.
    MaxPixels,
}

/// Size ceiling for one run. Immutable, read-only configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetConfig {
    pub mode: BudgetMode,
    pub value: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        // round(0.95 × 25) MB, the original tool's ceiling, in MiB terms.
        Self {
            mode: BudgetMode::MaxBytes,
            value: 24 * 1024 * 1024,
        }
    }
}

/// Reduction loop parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReducerSettings {
    /// Linear shrink per attempt; 1.2 means each axis divides by 1.2
    /// (≈36% area reduction per step).
    pub shrink_ratio: f64,
    /// Iteration cap; breaching it yields a budget-unreachable outcome.
    pub max_attempts: u32,
    /// Neither axis may shrink below this.
    pub min_dimension: u32,
    /// JPEG quality used both for size measurement and final output.
    pub quality: u32,
}

impl Default for ReducerSettings {
    fn default() -> Self {
        Self {
            shrink_ratio: 1.2,
            max_attempts: 100,
            min_dimension: 1,
            quality: 90,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel per-file workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// A stock `photoshrink.toml` with every option present and documented.
pub fn stock_config_toml() -> String {
    let stock = r#"# photoshrink configuration
# All options are optional - the values below are the defaults.

[budget]
# "max-bytes": value is a maximum encoded byte count.
# "max-pixels": value is a maximum pixel count (single-shot resize).
mode = "max-bytes"
value = 25165824

[reducer]
# Linear shrink per attempt. Each axis divides by this ratio, so 1.2
# removes about a third of the pixels per step.
shrink_ratio = 1.2
# Give up (budget unreachable) after this many resize attempts.
max_attempts = 100
# Neither axis may shrink below this many pixels.
min_dimension = 1
# JPEG quality used for size measurement and for the written output.
quality = 90

[processing]
# Max parallel per-file workers. Omit for one worker per CPU core.
# max_processes = 4
"#;
    stock.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_ceiling() {
        let config = RunConfig::default();
        assert_eq!(config.budget.mode, BudgetMode::MaxBytes);
        assert_eq!(config.budget.value, 25_165_824);
        assert_eq!(config.reducer.shrink_ratio, 1.2);
        assert_eq!(config.reducer.max_attempts, 100);
        assert_eq!(config.reducer.min_dimension, 1);
        assert_eq!(config.reducer.quality, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stock_config_parses_back_to_defaults() {
        let parsed: RunConfig = toml::from_str(&stock_config_toml()).unwrap();
        let defaults = RunConfig::default();
        assert_eq!(parsed.budget.mode, defaults.budget.mode);
        assert_eq!(parsed.budget.value, defaults.budget.value);
        assert_eq!(parsed.reducer.max_attempts, defaults.reducer.max_attempts);
    }

    #[test]
    fn sparse_config_overrides_only_named_values() {
        let config: RunConfig = toml::from_str(
            r#"
            [budget]
            mode = "max-pixels"
            value = 24000000
            "#,
        )
        .unwrap();
        assert_eq!(config.budget.mode, BudgetMode::MaxPixels);
        assert_eq!(config.budget.value, 24_000_000);
        // Untouched section keeps defaults
        assert_eq!(config.reducer.shrink_ratio, 1.2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = toml::from_str::<RunConfig>(
            r#"
            [reducer]
            shrink_ration = 1.5
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = RunConfig::default();
        config.reducer.shrink_ratio = 1.0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.budget.value = 0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.reducer.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.reducer.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_file_and_validates() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("photoshrink.toml");
        std::fs::write(&path, "[reducer]\nmax_attempts = 0\n").unwrap();
        assert!(matches!(
            RunConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));

        std::fs::write(&path, "[reducer]\nmax_attempts = 5\n").unwrap();
        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.reducer.max_attempts, 5);
    }

    #[test]
    fn effective_threads_clamps_to_cores() {
        let auto = effective_threads(&ProcessingConfig::default());
        assert!(auto >= 1);
        let capped = effective_threads(&ProcessingConfig {
            max_processes: Some(1),
        });
        assert_eq!(capped, 1);
        let over = effective_threads(&ProcessingConfig {
            max_processes: Some(100_000),
        });
        assert!(over <= auto);
    }
}
