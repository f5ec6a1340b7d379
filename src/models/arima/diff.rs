//! Lag differencing and its inverse.

/// Difference `series` at `lag`, `times` times over.
fn lag_difference(series: &[f64], times: usize, lag: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..times {
        if lag == 0 || result.len() <= lag {
            return Vec::new();
        }
        result = result[lag..]
            .iter()
            .zip(&result)
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Undo one round of lag differencing for values that follow `history`.
///
/// Missing history (fewer than `lag` values) counts as zero.
fn undo_lag_difference(differenced: &[f64], history: &[f64], lag: usize) -> Vec<f64> {
    let mut extended: Vec<f64> = vec![0.0; lag.saturating_sub(history.len())];
    extended.extend_from_slice(&history[history.len().saturating_sub(lag)..]);
    for &delta in differenced {
        let base = extended[extended.len() - lag];
        extended.push(base + delta);
    }
    extended.split_off(lag)
}

/// First-difference a series `d` times.
///
/// Each round shortens the series by one; differencing a series that is too
/// short yields an empty vector.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    lag_difference(series, d, 1)
}

/// Seasonal differencing `y_t - y_{t-period}`, applied `d` times.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if d == 0 {
        return series.to_vec();
    }
    lag_difference(series, d, period)
}

/// Continue `original` with values whose `d`-th differences are `differenced`.
pub fn integrate(differenced: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    seasonal_integrate(differenced, original, d, 1)
}

/// Continue `original` with values whose `d`-th seasonal differences at
/// `period` are `differenced`.
pub fn seasonal_integrate(differenced: &[f64], original: &[f64], d: usize, period: usize) -> Vec<f64> {
    if d == 0 || period == 0 {
        return differenced.to_vec();
    }
    (0..d).rev().fold(differenced.to_vec(), |values, level| {
        let history = lag_difference(original, level, period);
        undo_lag_difference(&values, &history, period)
    })
}
