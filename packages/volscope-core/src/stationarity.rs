//! Augmented Dickey-Fuller unit-root test.
//!
//! Regression with a constant term:
//!
//! `Δx_t = α + γ·x_{t-1} + Σ_{i=1..p} β_i·Δx_{t-i} + ε_t`
//!
//! The lag order `p` is chosen by minimum AIC over a common sample, the chosen model is
//! re-fitted on its longest sample, and the t-statistic of `γ` is compared against the
//! MacKinnon response surfaces for a p-value and critical values.

use crate::types::{AdfResult, CriticalValues, PriceData, StationarityReport};
use crate::{Error, Result};

/// Shortest series the test will run on.
pub const MIN_OBSERVATIONS: usize = 8;

/// Run the ADF test (constant, AIC lag selection) on a series.
///
/// # Arguments
///
/// * `series` - Observations in time order
/// * `significance` - p-value at or below which the series counts as stationary
///
/// # Returns
///
/// `AdfResult`, or an error if the series is too short or the regression is singular.
pub fn adf_test(series: &[f64], significance: f64) -> Result<AdfResult> {
    let n = series.len();
    if n < MIN_OBSERVATIONS {
        return Err(Error::InsufficientData(format!(
            "Need at least {} observations for the ADF test, got {}",
            MIN_OBSERVATIONS, n
        )));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidOperation(
            "ADF test requires finite observations".to_string(),
        ));
    }

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let max_lag = max_lag(n);

    // Every candidate lag is fitted on the sample the longest lag allows
    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=max_lag {
        let (x, y) = design(series, &diffs, max_lag, lags);
        let fit = Ols::fit(&x, &y)?;
        let aic = fit.aic();
        if best.map_or(true, |(best_aic, _)| aic < best_aic) {
            best = Some((aic, lags));
        }
    }
    let used_lag = best.map(|(_, lags)| lags).unwrap_or(0);

    let (x, y) = design(series, &diffs, used_lag, used_lag);
    let fit = Ols::fit(&x, &y)?;
    let statistic = fit.t_value(LEVEL_COLUMN);
    if !statistic.is_finite() {
        return Err(Error::InvalidOperation(
            "ADF regression has no residual variance".to_string(),
        ));
    }

    let p_value = mackinnon_p(statistic);
    Ok(AdfResult {
        statistic,
        p_value,
        used_lag,
        nobs: y.len(),
        critical_values: mackinnon_critical_values(y.len()),
        stationary: p_value <= significance,
    })
}

/// ADF test on both the price level and the daily returns of a loaded file.
///
/// Both tests run over the rows that have a return, so the first price is left out
/// of the price-level test.
pub fn stationarity_report(data: &PriceData, significance: f64) -> Result<StationarityReport> {
    let prices = data.prices.prices.get(1..).unwrap_or_default();
    Ok(StationarityReport {
        name: data.name.clone(),
        price: adf_test(prices, significance)?,
        returns: adf_test(&data.returns.values, significance)?,
    })
}

/// Schwert's rule `ceil(12 * (n / 100)^(1/4))`, capped so the regression keeps
/// enough degrees of freedom.
fn max_lag(n: usize) -> usize {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min((n / 2).saturating_sub(2))
}

const LEVEL_COLUMN: usize = 1;

/// Regressors `[1, x_{t-1}, Δx_{t-1}, ..., Δx_{t-lags}]` and target `Δx_t`,
/// for every `t` from `start` to the end of `diffs`.
fn design(series: &[f64], diffs: &[f64], start: usize, lags: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    debug_assert!(lags <= start);

    (start..diffs.len())
        .map(|t| {
            let mut row = Vec::with_capacity(lags + 2);
            row.push(1.0);
            row.push(series[t]);
            row.extend((1..=lags).map(|i| diffs[t - i]));
            (row, diffs[t])
        })
        .unzip()
}

/// Ordinary least squares fit.
struct Ols {
    params: Vec<f64>,
    xtx_inv: Vec<Vec<f64>>,
    ssr: f64,
    nobs: usize,
}

impl Ols {
    fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        let nobs = y.len();
        let k = x.first().map_or(0, Vec::len);
        if nobs <= k {
            return Err(Error::InsufficientData(format!(
                "{} observations cannot fit {} regressors",
                nobs, k
            )));
        }

        let mut xtx = vec![vec![0.0; k]; k];
        let mut xty = vec![0.0; k];
        for (row, &target) in x.iter().zip(y) {
            for i in 0..k {
                xty[i] += row[i] * target;
                for j in 0..k {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }

        let xtx_inv = invert(xtx).ok_or_else(|| {
            Error::InvalidOperation("ADF regression matrix is singular".to_string())
        })?;

        let params: Vec<f64> = xtx_inv
            .iter()
            .map(|r| r.iter().zip(&xty).map(|(a, b)| a * b).sum())
            .collect();

        let ssr = x
            .iter()
            .zip(y)
            .map(|(row, &target)| {
                let fitted: f64 = row.iter().zip(&params).map(|(a, b)| a * b).sum();
                (target - fitted).powi(2)
            })
            .sum();

        Ok(Self {
            params,
            xtx_inv,
            ssr,
            nobs,
        })
    }

    fn k(&self) -> usize {
        self.params.len()
    }

    /// Gaussian log-likelihood at the fitted parameters.
    fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion, counting every regressor including the constant.
    fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.k() as f64
    }

    fn t_value(&self, i: usize) -> f64 {
        let sigma2 = self.ssr / (self.nobs - self.k()) as f64;
        self.params[i] / (sigma2 * self.xtx_inv[i][i]).sqrt()
    }
}

/// Gauss-Jordan inversion with partial pivoting. `None` if the matrix is singular.
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    let scale = a
        .iter()
        .flatten()
        .fold(0.0_f64, |m, v| m.max(v.abs()))
        .max(f64::MIN_POSITIVE);

    for col in 0..n {
        let pivot = (col..n).max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
        if a[pivot][col].abs() <= scale * 1e-13 {
            return None;
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for j in 0..n {
            a[col][j] /= p;
            inv[col][j] /= p;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Some(inv)
}

// MacKinnon (1994) response surface, constant-only regression, one variable.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) critical value surfaces `c0 + c1/n + c2/n^2 + c3/n^3`
const CRIT_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Approximate p-value of an ADF statistic (constant-only regression).
pub fn mackinnon_p(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let z = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    norm_cdf(z)
}

/// Critical values at 1%, 5% and 10% for a regression on `nobs` observations.
pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let inv = 1.0 / nobs as f64;
    CriticalValues {
        one_percent: polyval(&CRIT_1, inv),
        five_percent: polyval(&CRIT_5, inv),
        ten_percent: polyval(&CRIT_10, inv),
    }
}

/// `c[0] + c[1]·x + c[2]·x² + ...`
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Standard normal cumulative distribution function.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Complementary error function (Chebyshev fit, fractional error below 1.2e-7).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let r = t * (-z * z - 1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398
                                + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277)))))))))
        .exp();

    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}
