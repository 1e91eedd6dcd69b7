//! Trailing-window statistics.

/// Calculate a trailing simple moving average.
///
/// # Arguments
///
/// * `data` - Input series
/// * `window` - Number of observations per window
///
/// # Returns
///
/// One entry per input. The first `window - 1` entries are `None` since the window is
/// not yet full; the same holds for every entry when `window` is 0 or exceeds the data.
///
/// # Example
///
/// ```rust
/// use volscope_core::metrics::rolling_mean;
///
/// let prices = vec![10.0, 11.0, 12.0, 11.0];
/// let means = rolling_mean(&prices, 3);
///
/// assert_eq!(means[1], None);
/// // (10 + 11 + 12) / 3
/// assert!((means[2].unwrap() - 11.0).abs() < 1e-12);
/// ```
pub fn rolling_mean(data: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = data.len();
    let mut result = vec![None; n];

    if window == 0 || window > n {
        return result;
    }

    // Calculate first mean using simple sum
    let mut sum: f64 = data[..window].iter().sum();
    result[window - 1] = Some(sum / window as f64);

    // Slide the window for subsequent values
    for i in window..n {
        sum = sum - data[i - window] + data[i];
        result[i] = Some(sum / window as f64);
    }

    result
}

/// Calculate a trailing sample standard deviation (n - 1 denominator).
///
/// Alignment matches [`rolling_mean`]. Each window is computed directly rather than
/// from running sums so that long, low-variance series do not lose precision.
pub fn rolling_std(data: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = data.len();
    let mut result = vec![None; n];

    if window < 2 || window > n {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &data[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance =
            slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        result[i] = Some(variance.sqrt());
    }

    result
}
