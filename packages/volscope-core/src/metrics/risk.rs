//! Return, volatility and tail-risk statistics.
//!
//! Provides CAGR, annualized mean/volatility, Sharpe ratio, max drawdown and historical VaR.

use super::distribution::percentile;
use crate::config::AnalysisConfig;
use crate::types::{
    DailyMove, DrawdownInfo, PriceData, PriceSeries, ReturnSeries, RiskMetrics, VarEstimate,
};
use crate::{Error, Result};
use std::cmp::Ordering;

/// Days per calendar year used to turn a date span into years.
const DAYS_PER_YEAR: f64 = 365.25;

/// Calculate all risk metrics for one loaded price file.
///
/// # Arguments
///
/// * `data` - Prices and the daily returns derived from them
/// * `config` - Trading days, risk-free rate, VaR levels and top-mover count
///
/// # Returns
///
/// Returns `RiskMetrics`, or an error if there are no returns to measure.
pub fn compute_risk_metrics(data: &PriceData, config: &AnalysisConfig) -> Result<RiskMetrics> {
    let returns = &data.returns.values;
    if returns.is_empty() {
        return Err(Error::EmptyData(format!("{}: no returns to measure", data.name)));
    }

    let (start_date, first_price) = data
        .prices
        .first()
        .ok_or_else(|| Error::EmptyData(format!("{}: empty price series", data.name)))?;
    let (end_date, last_price) = data
        .prices
        .last()
        .ok_or_else(|| Error::EmptyData(format!("{}: empty price series", data.name)))?;

    let mean_daily = mean(returns);
    let std_daily = sample_std(returns);
    let (mean_annual, std_annual) = annualize(mean_daily, std_daily, config.trading_days);
    let sharpe = sharpe_ratio(
        mean_daily,
        std_daily,
        config.risk_free_daily(),
        config.trading_days,
    );

    let var = config
        .var_levels
        .iter()
        .map(|&confidence| {
            let pct = (1.0 - confidence) * 100.0;
            VarEstimate {
                confidence,
                percentile: pct,
                value: percentile(returns, pct),
            }
        })
        .collect();

    let drawdown = drawdown(&data.prices)
        .ok_or_else(|| Error::EmptyData(format!("{}: empty price series", data.name)))?;

    let (top_gains, top_losses) = top_movers(&data.returns, config.top_movers);

    Ok(RiskMetrics {
        start_date,
        end_date,
        observations: returns.len(),
        cagr: cagr(&data.prices),
        total_change: last_price / first_price - 1.0,
        mean_daily,
        std_daily,
        mean_annual,
        std_annual,
        sharpe_ratio: sharpe,
        risk_free_rate: config.risk_free_rate,
        var,
        drawdown,
        top_gains,
        top_losses,
    })
}

/// Compound annual growth rate from the first to the last price.
///
/// `(last / first)^(365.25 / days) - 1`. Returns `NaN` when the series spans no time
/// or starts at a non-positive price.
pub fn cagr(series: &PriceSeries) -> f64 {
    let (Some((start_date, start)), Some((end_date, end))) = (series.first(), series.last())
    else {
        return f64::NAN;
    };

    let days = (end_date - start_date).num_days() as f64;
    if days <= 0.0 || start <= 0.0 {
        return f64::NAN;
    }

    (end / start).powf(DAYS_PER_YEAR / days) - 1.0
}

/// Arithmetic mean; `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
///
/// Returns `NaN` for fewer than two values and exactly `0.0` when all values are equal.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }

    // Summation error would otherwise leave a tiny non-zero spread
    let first = values[0];
    if values.iter().all(|&v| v == first) {
        return 0.0;
    }

    let m = mean(values);
    let sum_sq = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Annualize a daily mean and standard deviation.
///
/// Mean scales linearly with `trading_days`, standard deviation with its square root.
pub fn annualize(mean_daily: f64, std_daily: f64, trading_days: usize) -> (f64, f64) {
    let days = trading_days as f64;
    (mean_daily * days, std_daily * days.sqrt())
}

/// Annualized Sharpe ratio from daily statistics.
///
/// # Arguments
///
/// * `mean_daily` - Mean daily return
/// * `std_daily` - Standard deviation of daily returns
/// * `rf_daily` - Daily risk-free rate (annual rate over `trading_days`)
/// * `trading_days` - Trading days per year
///
/// # Returns
///
/// `(mean - rf_daily) / std * sqrt(trading_days)`, or `NaN` if `std_daily` is zero or `NaN`.
pub fn sharpe_ratio(mean_daily: f64, std_daily: f64, rf_daily: f64, trading_days: usize) -> f64 {
    if std_daily == 0.0 || std_daily.is_nan() {
        return f64::NAN;
    }

    (mean_daily - rf_daily) / std_daily * (trading_days as f64).sqrt()
}

/// Maximum drawdown of a price path.
///
/// Returns the most negative `price / running_max - 1` (e.g., -0.25 for a 25% decline),
/// or `0.0` for a series that never falls below a previous high.
pub fn max_drawdown(prices: &[f64]) -> f64 {
    worst_drawdown(prices).0
}

/// Maximum drawdown together with the dates of its peak and trough.
///
/// For a series without any decline, peak and trough are both the first date.
/// Returns `None` for an empty series.
pub fn drawdown(series: &PriceSeries) -> Option<DrawdownInfo> {
    if series.is_empty() {
        return None;
    }

    let (max_drawdown, peak, trough) = worst_drawdown(&series.prices);
    Some(DrawdownInfo {
        max_drawdown,
        peak_date: series.dates[peak],
        trough_date: series.dates[trough],
    })
}

/// Deepest drawdown with the indices of its peak and trough.
fn worst_drawdown(prices: &[f64]) -> (f64, usize, usize) {
    let mut running_max = f64::NEG_INFINITY;
    let mut running_max_idx = 0;
    let mut worst = (0.0_f64, 0, 0);

    for (i, &price) in prices.iter().enumerate() {
        if price > running_max {
            running_max = price;
            running_max_idx = i;
        }
        let dd = price / running_max - 1.0;
        if dd < worst.0 {
            worst = (dd, running_max_idx, i);
        }
    }

    worst
}

/// Historical (non-parametric) Value at Risk.
///
/// The `(1 - confidence) * 100`-th percentile of the returns with linear interpolation,
/// so VaR 95% is the 5th percentile. Losses come back negative.
pub fn historical_var(returns: &[f64], confidence: f64) -> f64 {
    percentile(returns, (1.0 - confidence) * 100.0)
}

/// The `n` best and `n` worst days, best-first and worst-first respectively.
///
/// Equal returns keep their chronological order.
pub fn top_movers(returns: &ReturnSeries, n: usize) -> (Vec<DailyMove>, Vec<DailyMove>) {
    let moves: Vec<DailyMove> = returns
        .dates
        .iter()
        .zip(&returns.values)
        .map(|(&date, &ret)| DailyMove { date, ret })
        .collect();

    let mut gains = moves.clone();
    gains.sort_by(|a, b| b.ret.partial_cmp(&a.ret).unwrap_or(Ordering::Equal));
    gains.truncate(n);

    let mut losses = moves;
    losses.sort_by(|a, b| a.ret.partial_cmp(&b.ret).unwrap_or(Ordering::Equal));
    losses.truncate(n);

    (gains, losses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn series(prices: &[f64]) -> PriceSeries {
        let dates = (0..prices.len() as i64).map(day).collect();
        PriceSeries::new(dates, prices.to_vec())
    }

    // Helper to generate a deterministic zig-zag price path
    fn zigzag(n: usize) -> Vec<f64> {
        let mut price = 100.0;
        (0..n)
            .map(|i| {
                let r = 0.01 * ((i * 7 % 11) as f64 - 5.0) / 5.0;
                price *= 1.0 + r;
                price
            })
            .collect()
    }

    #[test]
    fn test_worked_example() {
        let data = PriceData::new("X", "Close", series(&[100.0, 110.0, 99.0, 108.9]));
        let metrics = compute_risk_metrics(&data, &AnalysisConfig::default()).unwrap();

        // returns [0.10, -0.10, 0.10]
        assert_relative_eq!(metrics.mean_daily, 0.1 / 3.0, epsilon = 1e-12);
        // deviations 0.2/3, -0.4/3, 0.2/3 -> sum of squares 0.24/9, over n - 1 = 2
        assert_relative_eq!(metrics.std_daily, (0.24_f64 / 18.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(metrics.drawdown.max_drawdown, 99.0 / 110.0 - 1.0, epsilon = 1e-12);
        assert_eq!(metrics.drawdown.peak_date, day(1));
        assert_eq!(metrics.drawdown.trough_date, day(2));

        // 3 days span
        let expected_cagr = (108.9_f64 / 100.0).powf(365.25 / 3.0) - 1.0;
        assert_relative_eq!(metrics.cagr, expected_cagr, max_relative = 1e-12);
        assert_relative_eq!(metrics.total_change, 0.089, epsilon = 1e-12);
        assert_eq!(metrics.observations, 3);
        assert_eq!(metrics.start_date, day(0));
        assert_eq!(metrics.end_date, day(3));
    }

    #[test]
    fn test_cagr_closed_form() {
        let dates = vec![day(0), day(730)];
        let prices = PriceSeries::new(dates, vec![50.0, 72.0]);
        let expected = (72.0_f64 / 50.0).powf(365.25 / 730.0) - 1.0;
        assert_relative_eq!(cagr(&prices), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_cagr_undefined() {
        let same_day = PriceSeries::new(vec![day(0)], vec![100.0]);
        assert!(cagr(&same_day).is_nan());
        assert!(cagr(&PriceSeries::default()).is_nan());
    }

    #[test]
    fn test_annualize() {
        let (mu, sigma) = annualize(0.001, 0.02, 252);
        assert_relative_eq!(mu, 0.252, epsilon = 1e-12);
        assert_relative_eq!(sigma, 0.02 * 252.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_sample_std() {
        let values = [1.0, 2.0, 3.0, 4.0];
        // variance = 5/3
        assert_relative_eq!(sample_std(&values), (5.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert!(sample_std(&[1.0]).is_nan());
        assert_eq!(sample_std(&[0.003; 50]), 0.0);
    }

    #[test]
    fn test_sharpe_ratio() {
        let sharpe = sharpe_ratio(0.001, 0.01, 0.02 / 252.0, 252);
        let expected = (0.001 - 0.02 / 252.0) / 0.01 * 252.0_f64.sqrt();
        assert_relative_eq!(sharpe, expected, epsilon = 1e-12);

        // Negative excess return = negative Sharpe
        assert!(sharpe_ratio(-0.001, 0.01, 0.02 / 252.0, 252) < 0.0);
    }

    #[test]
    fn test_sharpe_undefined_for_constant_returns() {
        let returns = vec![0.001; 100];
        let sigma = sample_std(&returns);
        assert!(sharpe_ratio(mean(&returns), sigma, 0.02 / 252.0, 252).is_nan());
        assert!(sharpe_ratio(0.001, f64::NAN, 0.02 / 252.0, 252).is_nan());
    }

    #[test]
    fn test_max_drawdown() {
        // Series that goes up, then down significantly
        let prices = [100.0, 110.0, 115.5, 98.175, 88.3575, 92.775375];
        let mdd = max_drawdown(&prices);
        assert_relative_eq!(mdd, 88.3575 / 115.5 - 1.0, epsilon = 1e-12);
        assert!(mdd < 0.0);
    }

    #[test]
    fn test_max_drawdown_no_loss() {
        let prices = [1.0, 1.0, 2.0, 3.0, 3.0, 4.0];
        assert_eq!(max_drawdown(&prices), 0.0);

        let info = drawdown(&series(&prices)).unwrap();
        assert_eq!(info.max_drawdown, 0.0);
        assert_eq!(info.peak_date, day(0));
        assert_eq!(info.trough_date, day(0));
    }

    #[test]
    fn test_max_drawdown_never_positive() {
        let prices = zigzag(300);
        let mdd = max_drawdown(&prices);
        assert!(mdd <= 0.0);
        assert!(mdd < 0.0, "a path with down days must have a drawdown");
        assert_eq!(drawdown(&series(&prices)).unwrap().max_drawdown, mdd);
    }

    #[test]
    fn test_drawdown_dates_match_max_drawdown() {
        // two declines; the second, from the later peak, is deeper
        let prices = [100.0, 120.0, 108.0, 130.0, 91.0, 95.0];
        let info = drawdown(&series(&prices)).unwrap();

        assert_relative_eq!(info.max_drawdown, 91.0 / 130.0 - 1.0, epsilon = 1e-12);
        assert_eq!(info.max_drawdown, max_drawdown(&prices));
        assert_eq!(info.peak_date, day(3));
        assert_eq!(info.trough_date, day(4));
        assert!(drawdown(&series(&[])).is_none());
    }

    #[test]
    fn test_sharpe_uses_configured_risk_free_rate() {
        let data = PriceData::new("X", "Close", series(&zigzag(120)));
        let mut config = AnalysisConfig::default();
        config.risk_free_rate = 0.05;
        let metrics = compute_risk_metrics(&data, &config).unwrap();

        let expected = (metrics.mean_daily - 0.05 / 252.0) / metrics.std_daily * 252.0_f64.sqrt();
        assert_relative_eq!(metrics.sharpe_ratio, expected, epsilon = 1e-12);
        assert_eq!(metrics.risk_free_rate, 0.05);
    }

    #[test]
    fn test_var_ordering() {
        let prices = zigzag(500);
        let data = PriceData::new("X", "Close", series(&prices));
        let returns = &data.returns.values;

        let var95 = historical_var(returns, 0.95);
        let var99 = historical_var(returns, 0.99);
        assert!(var99 <= var95);
        assert!(var95 < 0.0);
    }

    #[test]
    fn test_var_linear_interpolation() {
        // 101 evenly spaced returns from -0.05 to 0.05: 5th percentile lands on index 5
        let returns: Vec<f64> = (0..=100).map(|i| -0.05 + 0.001 * i as f64).collect();
        assert_relative_eq!(historical_var(&returns, 0.95), -0.045, epsilon = 1e-9);
        assert_relative_eq!(historical_var(&returns, 0.99), -0.049, epsilon = 1e-9);
    }

    #[test]
    fn test_top_movers() {
        let data = PriceData::new("X", "Close", series(&[100.0, 200.0, 100.0, 200.0, 200.0]));
        let (gains, losses) = top_movers(&data.returns, 2);

        assert_eq!(gains.len(), 2);
        assert_eq!(gains[0].ret, 1.0);
        // equal gains keep chronological order
        assert_eq!(gains[0].date, day(1));
        assert_eq!(gains[1].date, day(3));

        assert_eq!(losses[0].date, day(2));
        assert_eq!(losses[0].ret, -0.5);
        assert_eq!(losses[1].date, day(4));
        assert_eq!(losses[1].ret, 0.0);
    }

    #[test]
    fn test_top_movers_short_series() {
        let data = PriceData::new("X", "Close", series(&[100.0, 101.0]));
        let (gains, losses) = top_movers(&data.returns, 5);
        assert_eq!(gains.len(), 1);
        assert_eq!(losses.len(), 1);
    }

    #[test]
    fn test_var_levels_follow_config() {
        let data = PriceData::new("X", "Close", series(&zigzag(200)));
        let config = AnalysisConfig {
            var_levels: vec![0.90, 0.95, 0.99],
            ..Default::default()
        };
        let metrics = compute_risk_metrics(&data, &config).unwrap();

        assert_eq!(metrics.var.len(), 3);
        assert!(metrics.var_at(0.90).unwrap() >= metrics.var_at(0.95).unwrap());
        assert!(metrics.var_at(0.95).unwrap() >= metrics.var_at(0.99).unwrap());
        assert_relative_eq!(metrics.var[0].percentile, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_returns_rejected() {
        let data = PriceData::new("X", "Close", series(&[100.0]));
        let result = compute_risk_metrics(&data, &AnalysisConfig::default());
        assert!(matches!(result, Err(Error::EmptyData(_))));
    }
}
