//! Augmented Dickey-Fuller unit-root test.
//!
//! The regression with a constant is
//!
//! ```text
//! dy_t = a + b y_{t-1} + c_1 dy_{t-1} + ... + c_k dy_{t-k} + e_t
//! ```
//!
//! and the statistic is the t ratio of `b`. The lag count `k` minimises AIC
//! over `0..=max_lags` on a common sample, then the chosen regression is
//! refitted on every available observation. P-values and critical values use
//! MacKinnon's response surfaces for the constant-only case.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::info;

use crate::config::StationarityConfig;
use crate::error::{PipelineError, Result};
use crate::utils::ols::{ols_fit, OlsFit};

// MacKinnon (1994) p-value surface, constant term, one variable.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) finite-sample critical values, constant term.
const CRIT_1PCT: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5PCT: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10PCT: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Critical values of the test statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CriticalValues {
    pub cv_1pct: f64,
    pub cv_5pct: f64,
    pub cv_10pct: f64,
}

impl CriticalValues {
    fn for_nobs(nobs: usize) -> Self {
        let n = nobs as f64;
        let surface = |b: &[f64; 4]| b[0] + b[1] / n + b[2] / n.powi(2) + b[3] / n.powi(3);
        Self {
            cv_1pct: surface(&CRIT_1PCT),
            cv_5pct: surface(&CRIT_5PCT),
            cv_10pct: surface(&CRIT_10PCT),
        }
    }
}

/// Outcome of an ADF test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Lagged differences in the final regression.
    pub lags: usize,
    /// Observations in the final regression.
    pub n_obs: usize,
    pub critical_values: CriticalValues,
    pub significance: f64,
    /// The unit-root null is rejected at `significance`.
    pub is_stationary: bool,
}

/// Run the ADF test with a constant and AIC lag selection.
///
/// `max_lags` defaults to `ceil(12 * (n / 100)^(1/4))`, capped so the
/// regression keeps degrees of freedom.
///
/// # Errors
/// `InsufficientData` for series too short to regress, `InvalidParameter`
/// for non-finite input or a singular regression.
pub fn adf_test(series: &[f64], max_lags: Option<usize>, significance: f64) -> Result<StationarityResult> {
    let n = series.len();
    if n < 6 {
        return Err(PipelineError::InsufficientData { needed: 6, got: n });
    }
    if series.iter().any(|x| !x.is_finite()) {
        return Err(PipelineError::InvalidParameter(
            "stationarity test input must be finite".to_string(),
        ));
    }

    let default_lags = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let cap = (n / 2).saturating_sub(2);
    let max_lags = max_lags.unwrap_or(default_lags).min(cap);

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Every candidate uses the sample left after the largest lag.
    let best_lag = (0..=max_lags)
        .filter_map(|lag| {
            let (y, x) = design(series, &diffs, lag, max_lags);
            ols_fit(&y, &x).ok().map(|fit| (lag, fit.aic()))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(lag, _)| lag)
        .ok_or_else(|| PipelineError::InvalidParameter("ADF regression is singular".to_string()))?;

    let (y, x) = design(series, &diffs, best_lag, best_lag);
    let fit: OlsFit = ols_fit(&y, &x)?;
    // Column 1 is the lagged level.
    let statistic = fit.t_stat(1);
    let p_value = mackinnon_p_value(statistic)?;

    Ok(StationarityResult {
        statistic,
        p_value,
        lags: best_lag,
        n_obs: fit.nobs,
        critical_values: CriticalValues::for_nobs(fit.nobs),
        significance,
        is_stationary: p_value <= significance,
    })
}

/// Build `(dy_t, [1, y_{t-1}, dy_{t-1}..dy_{t-lag}])` rows, dropping the
/// first `skip` differences.
fn design(series: &[f64], diffs: &[f64], lag: usize, skip: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let rows = skip..diffs.len();
    let y = diffs[rows.clone()].to_vec();
    let x = rows
        .map(|t| {
            let mut row = Vec::with_capacity(lag + 2);
            row.push(1.0);
            row.push(series[t]);
            row.extend((1..=lag).map(|i| diffs[t - i]));
            row
        })
        .collect();
    (y, x)
}

/// Approximate p-value of an ADF statistic.
fn mackinnon_p_value(statistic: f64) -> Result<f64> {
    if statistic.is_nan() {
        return Ok(f64::NAN);
    }
    if statistic > TAU_MAX {
        return Ok(1.0);
    }
    if statistic < TAU_MIN {
        return Ok(0.0);
    }
    let coefficients: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);
    let normal = Normal::new(0.0, 1.0).map_err(|e| PipelineError::InvalidParameter(e.to_string()))?;
    Ok(normal.cdf(z))
}

/// ADF test configured from the pipeline settings, with a logged report.
pub fn test_stationarity(series: &[f64], name: &str, config: &StationarityConfig) -> Result<StationarityResult> {
    let result = adf_test(series, config.max_lags, config.significance)?;
    info!(
        series = name,
        statistic = result.statistic,
        p_value = result.p_value,
        lags = result.lags,
        n_obs = result.n_obs,
        cv_1pct = result.critical_values.cv_1pct,
        cv_5pct = result.critical_values.cv_5pct,
        cv_10pct = result.critical_values.cv_10pct,
        stationary = result.is_stationary,
        "augmented Dickey-Fuller test"
    );
    Ok(result)
}
