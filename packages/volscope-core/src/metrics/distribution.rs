//! Empirical distribution helpers: percentiles, histogram bins and outlier days.

use super::risk::{mean, sample_std};
use crate::types::{DailyMove, ReturnSeries};

/// Percentile with linear interpolation between closest ranks.
///
/// `rank = p / 100 * (n - 1)`; the result interpolates between the sorted values at
/// `floor(rank)` and `ceil(rank)`. This is the default rule in NumPy and pandas, so
/// results are reproducible across tools. `NaN` inputs are ignored.
///
/// # Arguments
///
/// * `values` - Sample, in any order
/// * `p` - Percentile in `[0, 100]` (clamped)
///
/// # Returns
///
/// The interpolated percentile, or `NaN` for an empty sample.
///
/// # Example
///
/// ```rust
/// use volscope_core::metrics::percentile;
///
/// let values = vec![4.0, 1.0, 3.0, 2.0];
/// // rank = 0.5 * 3 = 1.5 -> halfway between 2.0 and 3.0
/// assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
/// ```
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() || p.is_nan() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// One bar of a histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    /// Inclusive lower edge
    pub lower: f64,
    /// Upper edge (inclusive for the last bin only)
    pub upper: f64,
    /// Number of values in the bin
    pub count: usize,
}

/// Equal-width histogram spanning the finite values' range.
///
/// Bins are half-open `[lower, upper)` except the last, which also takes the maximum.
/// A sample with a single distinct value gets one bin of width 1 centred on it.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max == min {
        return vec![HistogramBin {
            lower: min - 0.5,
            upper: max + 0.5,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        result[idx].count += 1;
    }

    result
}

/// Days whose return lies more than `threshold` sample standard deviations from the mean.
///
/// Returns nothing when the spread is zero or undefined.
pub fn unusual_days(returns: &ReturnSeries, threshold: f64) -> Vec<DailyMove> {
    let m = mean(&returns.values);
    let sigma = sample_std(&returns.values);
    if !(sigma > 0.0) {
        return Vec::new();
    }

    returns
        .dates
        .iter()
        .zip(&returns.values)
        .filter(|(_, &r)| (r - m).abs() > threshold * sigma)
        .map(|(&date, &ret)| DailyMove { date, ret })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_percentile_matches_linear_rule() {
        let values = vec![15.0, 20.0, 35.0, 40.0, 50.0];
        assert_eq!(percentile(&values, 0.0), 15.0);
        assert_eq!(percentile(&values, 100.0), 50.0);
        assert_eq!(percentile(&values, 50.0), 35.0);
        // rank = 0.4 * 4 = 1.6 -> 20 + 0.6 * 15
        assert!((percentile(&values, 40.0) - 29.0).abs() < 1e-12);
        // rank = 0.05 * 4 = 0.2 -> 15 + 0.2 * 5
        assert!((percentile(&values, 5.0) - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_unsorted_and_nan() {
        let values = vec![3.0, f64::NAN, 1.0, 2.0];
        assert!((percentile(&values, 50.0) - 2.0).abs() < 1e-12);
        assert!(percentile(&[], 50.0).is_nan());
        assert!(percentile(&[f64::NAN], 50.0).is_nan());
    }

    #[test]
    fn test_percentile_monotonic_in_p() {
        let values: Vec<f64> = (0..97).map(|i| ((i * 37) % 97) as f64 / 97.0 - 0.5).collect();
        let mut prev = f64::NEG_INFINITY;
        for p in 0..=100 {
            let q = percentile(&values, p as f64);
            assert!(q >= prev);
            prev = q;
        }
    }

    #[test]
    fn test_histogram_counts() {
        let values = vec![0.0, 0.1, 0.2, 0.3, 0.4, 1.0];
        let bins = histogram(&values, 5);

        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[4].upper, 1.0);
        // max lands in the last bin
        assert_eq!(bins[4].count, 1);
    }

    #[test]
    fn test_histogram_degenerate() {
        assert!(histogram(&[], 10).is_empty());
        let bins = histogram(&[0.01, 0.01], 10);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);
    }

    #[test]
    fn test_unusual_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut values = vec![0.001, -0.001].repeat(20);
        values[17] = 0.2;
        let dates = (0..values.len() as i64)
            .map(|i| start + chrono::Duration::days(i))
            .collect();
        let returns = ReturnSeries { dates, values };

        let days = unusual_days(&returns, 3.0);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].ret, 0.2);
        assert_eq!(days[0].date, start + chrono::Duration::days(17));
    }

    #[test]
    fn test_unusual_days_constant_returns() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let returns = ReturnSeries {
            dates: vec![start, start + chrono::Duration::days(1)],
            values: vec![0.01, 0.01],
        };
        assert!(unusual_days(&returns, 3.0).is_empty());
    }
}
