//! Log-difference, test for a unit root, fit SARIMA and evaluate.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::core::PriceSeries;
use crate::error::Result;
use crate::ingest::require_data;
use crate::models::arima::SARIMA;
use crate::models::Forecaster;
use crate::transform::{reconstruct_forecast, stationarize};
use crate::utils::{calculate_metrics, AccuracyMetrics};
use crate::validation::{test_stationarity, StationarityResult};

/// Forecast next to the realized price for one held-out day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRecord {
    pub timestamp: NaiveDate,
    pub forecast: f64,
    pub actual: f64,
}

/// Forecast errors in both domains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastEvaluation {
    /// Differenced-log predictions against the differenced-log test series.
    pub stationarized: AccuracyMetrics,
    /// Reconstructed prices against the held-out prices.
    pub absolute: AccuracyMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub records: Vec<ForecastRecord>,
    /// Differenced-log predictions before reconstruction; entry `i` is the
    /// change from held-out day `i` to day `i + 1`.
    pub predictions: Vec<f64>,
    pub evaluation: ForecastEvaluation,
    /// Unit-root test on the raw prices.
    pub raw_stationarity: Option<StationarityResult>,
    /// Unit-root test on the stationarized training partition.
    pub train_stationarity: Option<StationarityResult>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
}

fn diagnose(series: &[f64], name: &str, config: &PipelineConfig) -> Option<StationarityResult> {
    match test_stationarity(series, name, &config.stationarity) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(series = name, error = %e, "stationarity test skipped");
            None
        }
    }
}

/// Hold out the last `holdout` prices and forecast them from the rest.
///
/// The model forecasts all `holdout` log-changes following the training
/// partition. The first held-out price anchors the reconstruction, so its
/// step is dropped and the forecast covers the remaining `holdout - 1` days,
/// each step paired with the change into that day.
///
/// # Errors
/// `InvalidParameter` if any price is zero, since the log transform needs
/// strictly positive prices.
pub fn forecast(series: &PriceSeries, config: &PipelineConfig) -> Result<ForecastReport> {
    require_data(series)?;
    let settings = &config.forecast;
    let split = series.split_holdout(settings.holdout)?;

    let train_log = stationarize(&split.train.prices())?;
    let test_prices = split.test.prices();
    let test_log = stationarize(&test_prices)?;

    let raw_stationarity = diagnose(&series.prices(), "raw", config);
    let train_stationarity = diagnose(&train_log, "train_log", config);

    let mut model = SARIMA::new(settings.order, settings.seasonal_order)
        .with_solver(settings.max_iterations, settings.tolerance);
    model.fit(&train_log)?;
    let ahead = model.predict(settings.holdout)?.into_values();
    // Step 0 is the change into the anchor day.
    let predictions: Vec<f64> = ahead.into_iter().skip(1).collect();

    let anchor = test_prices[0];
    let reconstructed = reconstruct_forecast(&predictions, anchor);
    let actual = &test_prices[1..];

    let evaluation = ForecastEvaluation {
        stationarized: calculate_metrics(&test_log, &predictions)?,
        absolute: calculate_metrics(actual, &reconstructed)?,
    };
    info!(
        horizon = predictions.len(),
        anchor,
        mse_log_diff = evaluation.stationarized.mse,
        rmse_log_diff = evaluation.stationarized.rmse,
        mae_log_diff = evaluation.stationarized.mae,
        rmse_price = evaluation.absolute.rmse,
        mae_price = evaluation.absolute.mae,
        "forecast evaluated"
    );

    let records = split.test.points()[1..]
        .iter()
        .zip(&reconstructed)
        .map(|(point, &forecast)| ForecastRecord {
            timestamp: point.timestamp,
            forecast,
            actual: point.price,
        })
        .collect();

    Ok(ForecastReport {
        records,
        predictions,
        evaluation,
        raw_stationarity,
        train_stationarity,
        aic: model.aic(),
        bic: model.bic(),
    })
}
