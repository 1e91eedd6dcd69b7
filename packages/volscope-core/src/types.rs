//! Core data types for volscope.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Daily closing prices, ascending by date with unique dates.
///
/// Every price is finite and strictly positive; the loader drops rows that are not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceSeries {
    /// Trading dates
    pub dates: Vec<NaiveDate>,
    /// Prices aligned with `dates`
    pub prices: Vec<f64>,
}

impl PriceSeries {
    /// Create a price series from already sorted, deduplicated points.
    pub fn new(dates: Vec<NaiveDate>, prices: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), prices.len());
        Self { dates, prices }
    }

    /// Number of price observations.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether the series holds no prices.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// First (date, price) pair.
    pub fn first(&self) -> Option<(NaiveDate, f64)> {
        Some((*self.dates.first()?, *self.prices.first()?))
    }

    /// Last (date, price) pair.
    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        Some((*self.dates.last()?, *self.prices.last()?))
    }
}

/// Simple daily returns derived from a [`PriceSeries`].
///
/// `values[i] = price[i + 1] / price[i] - 1`, dated at the later of the two days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReturnSeries {
    /// Dates of the second price in each pair
    pub dates: Vec<NaiveDate>,
    /// Returns as decimals (0.01 for 1%)
    pub values: Vec<f64>,
}

impl ReturnSeries {
    /// Percentage change between consecutive prices. The first price yields no return.
    pub fn from_prices(series: &PriceSeries) -> Self {
        let values = series
            .prices
            .windows(2)
            .map(|w| w[1] / w[0] - 1.0)
            .collect();
        let dates = series.dates.iter().skip(1).copied().collect();
        Self { dates, values }
    }

    /// Number of return observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no returns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A loaded input file: prices, the derived returns, and where they came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceData {
    /// Instrument name, taken from the file stem (e.g. `TSLA`)
    pub name: String,
    /// Header of the column the prices were read from (`Adj Close` or `Close`)
    pub price_column: String,
    /// Price series
    pub prices: PriceSeries,
    /// Daily returns
    pub returns: ReturnSeries,
}

impl PriceData {
    /// Build from a price series, deriving returns.
    pub fn new(
        name: impl Into<String>,
        price_column: impl Into<String>,
        prices: PriceSeries,
    ) -> Self {
        let returns = ReturnSeries::from_prices(&prices);
        Self {
            name: name.into(),
            price_column: price_column.into(),
            prices,
            returns,
        }
    }
}

/// A single trading day's return.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DailyMove {
    pub date: NaiveDate,
    /// Return as a decimal
    #[serde(rename = "return")]
    pub ret: f64,
}

/// Historical Value-at-Risk at one confidence level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VarEstimate {
    /// Confidence level (e.g. 0.95)
    pub confidence: f64,
    /// Percentile of the return distribution that was read (e.g. 5.0)
    pub percentile: f64,
    /// Daily return at that percentile; negative for a loss
    pub value: f64,
}

/// Deepest peak-to-trough decline of a price series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DrawdownInfo {
    /// Most negative `price / running_max - 1` (0.0 for a series that never declines)
    pub max_drawdown: f64,
    /// Date of the running maximum preceding the trough
    pub peak_date: NaiveDate,
    /// Date of the trough
    pub trough_date: NaiveDate,
}

/// Risk and return statistics for one price series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// First date of the price series
    pub start_date: NaiveDate,
    /// Last date of the price series
    pub end_date: NaiveDate,
    /// Number of daily returns
    pub observations: usize,
    /// Compound annual growth rate (NaN if undefined)
    pub cagr: f64,
    /// Last price / first price - 1
    pub total_change: f64,
    /// Mean daily return
    pub mean_daily: f64,
    /// Sample standard deviation of daily returns
    pub std_daily: f64,
    /// Mean daily return times trading days
    pub mean_annual: f64,
    /// Daily standard deviation times sqrt(trading days)
    pub std_annual: f64,
    /// Annualized Sharpe ratio (NaN if volatility is zero or undefined)
    pub sharpe_ratio: f64,
    /// Annual risk-free rate used for the Sharpe ratio
    pub risk_free_rate: f64,
    /// Historical VaR, one entry per configured confidence level
    pub var: Vec<VarEstimate>,
    /// Maximum drawdown of the price series
    pub drawdown: DrawdownInfo,
    /// Largest daily returns, best first
    pub top_gains: Vec<DailyMove>,
    /// Smallest daily returns, worst first
    pub top_losses: Vec<DailyMove>,
}

impl RiskMetrics {
    /// VaR at a given confidence level, if it was computed.
    pub fn var_at(&self, confidence: f64) -> Option<f64> {
        self.var
            .iter()
            .find(|v| (v.confidence - confidence).abs() < 1e-12)
            .map(|v| v.value)
    }
}

/// MacKinnon critical values for an ADF statistic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CriticalValues {
    #[serde(rename = "1%")]
    pub one_percent: f64,
    #[serde(rename = "5%")]
    pub five_percent: f64,
    #[serde(rename = "10%")]
    pub ten_percent: f64,
}

/// Outcome of an Augmented Dickey-Fuller test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AdfResult {
    /// t-statistic of the lagged level coefficient
    pub statistic: f64,
    /// Approximate p-value (MacKinnon 1994)
    pub p_value: f64,
    /// Number of lagged differences in the regression
    pub used_lag: usize,
    /// Observations in the final regression
    pub nobs: usize,
    /// Critical values (MacKinnon 2010)
    pub critical_values: CriticalValues,
    /// `p_value <= significance`
    pub stationary: bool,
}

/// ADF results for the price level and for daily returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationarityReport {
    pub name: String,
    pub price: AdfResult,
    pub returns: AdfResult,
}

/// Paths written while processing one input file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FileOutputs {
    /// Instrument name
    pub name: String,
    /// Report file
    pub report: PathBuf,
    /// Chart images (empty when plotting is disabled)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plots: Vec<PathBuf>,
    /// Unusual-days CSV
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unusual_days: Option<PathBuf>,
}

/// An input that could not be processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedFile {
    pub name: String,
    pub error: String,
}

/// Outcome of a batch run over an input directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RunSummary {
    pub processed: Vec<FileOutputs>,
    pub failed: Vec<FailedFile>,
}

impl RunSummary {
    /// Number of inputs seen.
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}

/// API response wrapper for CLI output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
