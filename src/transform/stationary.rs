//! Log-differencing of prices and recovery of price levels from forecasts.

use crate::error::{PipelineError, Result};
use crate::models::arima::difference;

/// Base-10 logarithm followed by a first difference.
///
/// The output is one shorter than the input; fewer than two prices give an
/// empty vector.
///
/// # Errors
/// `InvalidParameter` if any price is not strictly positive. A series may
/// legally hold a zero price, but a single zero makes the forecast flow fail.
pub fn stationarize(prices: &[f64]) -> Result<Vec<f64>> {
    if let Some(p) = prices.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
        return Err(PipelineError::InvalidParameter(format!(
            "log transform needs positive finite prices, got {}",
            p
        )));
    }
    let logs: Vec<f64> = prices.iter().map(|p| p.log10()).collect();
    Ok(difference(&logs, 1))
}

/// Chain differenced-log predictions back onto `last_known_price`.
///
/// Step `i` is `last_known_price * exp(d_0 + ... + d_i)`.
pub fn reconstruct_forecast(predictions: &[f64], last_known_price: f64) -> Vec<f64> {
    predictions
        .iter()
        .scan(0.0, |cumulative, d| {
            *cumulative += d;
            Some(last_known_price * cumulative.exp())
        })
        .collect()
}
