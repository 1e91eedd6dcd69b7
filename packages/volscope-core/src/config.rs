//! Run configuration: analysis constants, directories, plotting and report options.
//!
//! Every field has a default, so an absent or partial `config.toml` is valid.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub paths: PathsConfig,
    pub plot: PlotConfig,
    pub report: ReportConfig,
}

/// Constants used by the metric calculations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rolling window in observations (about one trading month)
    pub rolling_window: usize,
    /// Trading days per year used for annualization
    pub trading_days: usize,
    /// Annual risk-free rate for the Sharpe ratio
    pub risk_free_rate: f64,
    /// Confidence levels for historical VaR
    pub var_levels: Vec<f64>,
    /// Number of best and worst days listed in the report
    pub top_movers: usize,
    /// Standard deviations from the mean beyond which a day counts as unusual
    pub outlier_threshold: f64,
    /// p-value at or below which the ADF test calls a series stationary
    pub significance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rolling_window: 20,
            trading_days: 252,
            risk_free_rate: 0.02,
            var_levels: vec![0.95, 0.99],
            top_movers: 5,
            outlier_threshold: 3.0,
            significance: 0.05,
        }
    }
}

impl AnalysisConfig {
    /// Daily risk-free rate.
    pub fn risk_free_daily(&self) -> f64 {
        self.risk_free_rate / self.trading_days as f64
    }

    /// Check that the constants describe a computable analysis.
    pub fn validate(&self) -> Result<()> {
        if self.rolling_window < 2 {
            return Err(Error::InvalidConfig(format!(
                "rolling_window must be at least 2, got {}",
                self.rolling_window
            )));
        }
        if self.trading_days == 0 {
            return Err(Error::InvalidConfig(
                "trading_days must be positive".to_string(),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(Error::InvalidConfig(
                "risk_free_rate must be finite".to_string(),
            ));
        }
        if self.var_levels.is_empty() {
            return Err(Error::InvalidConfig(
                "var_levels must not be empty".to_string(),
            ));
        }
        if let Some(level) = self.var_levels.iter().find(|&&c| !(c > 0.0 && c < 1.0)) {
            return Err(Error::InvalidConfig(format!(
                "VaR confidence level must be in (0, 1), got {}",
                level
            )));
        }
        if self.top_movers == 0 {
            return Err(Error::InvalidConfig(
                "top_movers must be positive".to_string(),
            ));
        }
        if !(self.outlier_threshold > 0.0) {
            return Err(Error::InvalidConfig(
                "outlier_threshold must be positive".to_string(),
            ));
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "significance must be in (0, 1), got {}",
                self.significance
            )));
        }
        Ok(())
    }
}

/// Input and output directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory scanned for `*.csv` price files
    pub input_dir: PathBuf,
    /// Directory for chart images and the unusual-days export
    pub plots_dir: PathBuf,
    /// Directory for report files
    pub reports_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/cleaned"),
            plots_dir: PathBuf::from("outputs/plots"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

/// Chart rendering options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotConfig {
    /// Render charts at all
    pub enabled: bool,
    /// Bars in the return histogram
    pub histogram_bins: usize,
    /// TrueType font for titles and labels; system fonts are tried when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_bins: 60,
            font_path: None,
        }
    }
}

/// Report options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Extra markdown appended to the report of any instrument whose name contains the key
    pub notes: BTreeMap<String, String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let mut notes = BTreeMap::new();
        notes.insert(
            "TSLA".to_string(),
            "**Tesla focus:** Given TSLA's high-growth profile, elevated volatility is expected. \
             Rolling standard deviation spikes often align with major news or earnings; use \
             volatility-aware position sizing and consider scenario analysis around catalysts."
                .to_string(),
        );
        Self { notes }
    }
}

impl ReportConfig {
    /// Note for an instrument, matched case-insensitively on the name.
    pub fn note_for(&self, name: &str) -> Option<&str> {
        let upper = name.to_uppercase();
        self.notes
            .iter()
            .find(|(key, _)| upper.contains(&key.to_uppercase()))
            .map(|(_, note)| note.as_str())
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Default path: `~/.volscope/config.toml`
    /// Can be overridden with `VOLSCOPE_CONFIG` environment variable.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("VOLSCOPE_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".volscope/config.toml"))
            .unwrap_or_else(|| PathBuf::from("volscope.toml"))
    }

    /// Load and validate configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        if self.plot.histogram_bins == 0 {
            return Err(Error::InvalidConfig(
                "histogram_bins must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analysis.rolling_window, 20);
        assert_eq!(config.analysis.trading_days, 252);
        assert_eq!(config.analysis.risk_free_rate, 0.02);
        assert_eq!(config.analysis.var_levels, vec![0.95, 0.99]);
        assert_eq!(config.paths.reports_dir, PathBuf::from("reports"));
        assert_eq!(config.plot.histogram_bins, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [analysis]
            rolling_window = 30
            risk_free_rate = 0.04

            [paths]
            input_dir = "prices"
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.rolling_window, 30);
        assert_eq!(config.analysis.risk_free_rate, 0.04);
        assert_eq!(config.analysis.trading_days, 252);
        assert_eq!(config.paths.input_dir, PathBuf::from("prices"));
        assert_eq!(config.paths.plots_dir, PathBuf::from("outputs/plots"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_var_level() {
        let result = Config::from_toml("[analysis]\nvar_levels = [0.95, 1.0]\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_window() {
        let result = Config::from_toml("[analysis]\nrolling_window = 1\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_bins_rejected() {
        let result = Config::from_toml("[plot]\nhistogram_bins = 0\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml("[analysis\nrolling_window = ");
        assert!(matches!(result, Err(Error::TomlDe(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[plot]\nenabled = false\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert!(!config.plot.enabled);
    }

    #[test]
    fn test_risk_free_daily() {
        let analysis = AnalysisConfig::default();
        assert!((analysis.risk_free_daily() - 0.02 / 252.0).abs() < 1e-15);
    }

    #[test]
    fn test_note_lookup() {
        let report = ReportConfig::default();
        assert!(report.note_for("tsla").is_some());
        assert!(report.note_for("TSLA_2015").is_some());
        assert!(report.note_for("SPY").is_none());
    }
}
