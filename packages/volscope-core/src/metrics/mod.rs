//! Risk and return metrics over loaded price data.
//!
//! The functions here are pure: the same input always yields the same output.
//! Undefined quantities such as the Sharpe ratio of a flat series come back as `NaN`.

mod distribution;
mod risk;
mod rolling;

pub use distribution::{histogram, percentile, unusual_days, HistogramBin};
pub use risk::{
    annualize, cagr, compute_risk_metrics, drawdown, historical_var, max_drawdown, mean,
    sample_std, sharpe_ratio, top_movers,
};
pub use rolling::{rolling_mean, rolling_std};
