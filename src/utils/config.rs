//! Configuration and constants for the dashboard.

use super::error::ConfigError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current page report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Default directory holding the dataset CSVs
pub const DEFAULT_DATA_DIR: &str = "marketing_dataset";

/// Default currency prefix (Indian rupee)
pub const DEFAULT_CURRENCY_PREFIX: &str = "₹";

// Magnitude thresholds for K/M/B suffixes
pub const THOUSAND: f64 = 1e3;
pub const MILLION: f64 = 1e6;
pub const BILLION: f64 = 1e9;

/// Pseudo-column accepted by `Count` to count rows instead of values
pub const ROW_COUNT_COLUMN: &str = "*";

// Correlation strength bands used for correlation notes
pub const STRONG_CORRELATION: f64 = 0.7;
pub const MODERATE_CORRELATION: f64 = 0.4;

/// Donut hole used when a donut chart does not set one
pub const DEFAULT_DONUT_HOLE: f64 = 0.4;

// AUC rating bands
pub const AUC_EXCELLENT: f64 = 0.9;
pub const AUC_GOOD: f64 = 0.8;
pub const AUC_FAIR: f64 = 0.7;

/// Dashboard-wide settings
///
/// Loaded from TOML; every field has a default so an empty file is valid.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory containing the dataset CSV files
    pub data_dir: PathBuf,

    /// Prefix placed in front of currency values
    pub currency_prefix: String,

    /// Decimals used for K/M/B magnitudes on metric cards
    pub magnitude_decimals: usize,

    /// Decimals used for percentages on metric cards
    pub percent_decimals: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            currency_prefix: DEFAULT_CURRENCY_PREFIX.to_string(),
            magnitude_decimals: 1,
            percent_decimals: 1,
        }
    }
}

impl DashboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_currency_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.currency_prefix = prefix.into();
        self
    }
}

/// Load a dashboard config from a TOML file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Parse` - If TOML is invalid
///
/// # Example
/// ```ignore
/// let config = load_config("dashboard.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<DashboardConfig, ConfigError> {
    let path = path.as_ref();
    debug!("Reading dashboard config from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    let config: DashboardConfig = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "data_dir = \"/srv/data\"").unwrap();
        writeln!(file, "currency_prefix = \"$\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.currency_prefix, "$");
        assert_eq!(config.magnitude_decimals, 1);
    }

    #[test]
    fn test_load_config_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "data_dir = [").unwrap();

        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
