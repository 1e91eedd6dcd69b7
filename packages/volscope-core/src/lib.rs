//! Volscope Core - Volatility and risk reporting for historical price series.
//!
//! This crate turns daily price CSVs into descriptive risk statistics:
//!
//! - **Loading**: Date parsing, price column selection, simple daily returns
//! - **Risk metrics**: CAGR, annualized volatility, Sharpe ratio, max drawdown, historical VaR
//! - **Stationarity**: Augmented Dickey-Fuller test with MacKinnon p-values
//! - **Output**: Markdown/text reports and PNG charts, one set per input file
//!
//! # Example
//!
//! ```rust,no_run
//! use volscope_core::{config::AnalysisConfig, loader, metrics};
//!
//! let data = loader::load_price_series("data/cleaned/SPY.csv")?;
//! let risk = metrics::compute_risk_metrics(&data, &AnalysisConfig::default())?;
//! println!("CAGR: {:.2}%", risk.cagr * 100.0);
//! # Ok::<(), volscope_core::Error>(())
//! ```

pub mod config;
pub mod loader;
pub mod metrics;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod stationarity;
pub mod types;

// Re-export commonly used types
pub use config::{AnalysisConfig, Config, PathsConfig, PlotConfig, ReportConfig};
pub use types::{
    AdfResult, ApiResponse, DailyMove, DrawdownInfo, FileOutputs, PriceData, RiskMetrics,
    RunSummary, StationarityReport, VarEstimate,
};

// Re-export main functionality
pub use loader::load_price_series;
pub use metrics::{
    cagr, compute_risk_metrics, historical_var, max_drawdown, percentile, rolling_mean,
    rolling_std, sample_std, sharpe_ratio, top_movers, unusual_days,
};
pub use pipeline::{process_file, run_stationarity, run_volatility};
pub use stationarity::{adf_test, stationarity_report};

/// Error types for volscope-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

/// Result type for volscope-core operations.
pub type Result<T> = std::result::Result<T, Error>;
