//! Split, scale, window, train, score and flag.

use tracing::info;

use crate::config::{DetectorConfig, PipelineConfig, ThresholdConfig};
use crate::core::{PriceSeries, Split};
use crate::detection::{
    build_records, max_training_error, percentile_threshold, reconstruction_rmse, window_scores,
    DetectionReport, LstmAutoencoder, SequenceReconstructor, ThresholdPolicy,
};
use crate::error::{PipelineError, Result};
use crate::ingest::require_data;
use crate::transform::{make_windows, ScalerState, WindowSet};

/// Everything the detector consumes, derived deterministically from the
/// series and the detector settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionInputs {
    pub split: Split,
    /// Fitted on the training partition only.
    pub scaler: ScalerState,
    pub train: WindowSet,
    pub test: WindowSet,
}

/// Partition, scale and window a series.
///
/// # Errors
/// `DataUnavailable` for an empty series, `InsufficientData` when either
/// partition is too short to yield a single window.
pub fn prepare(series: &PriceSeries, config: &DetectorConfig) -> Result<DetectionInputs> {
    require_data(series)?;
    let split = series.split_fraction(config.train_fraction)?;
    let n_steps = config.n_steps;
    for part in [&split.train, &split.test] {
        if part.len() <= n_steps {
            return Err(PipelineError::InsufficientData {
                needed: n_steps + 1,
                got: part.len(),
            });
        }
    }

    let scaler = ScalerState::fit(&split.train.prices())?;
    info!(center = scaler.center, scale = scaler.scale, "robust scaler fitted");

    let train = make_windows(&scaler.transform(&split.train.prices()), n_steps);
    let test = make_windows(&scaler.transform(&split.test.prices()), n_steps);
    info!(
        train_points = split.train.len(),
        test_points = split.test.len(),
        train_windows = train.len(),
        test_windows = test.len(),
        n_steps,
        "windows built"
    );

    Ok(DetectionInputs {
        split,
        scaler,
        train,
        test,
    })
}

/// Threshold from the training and test scores under `config.policy`.
pub fn select_threshold(config: &ThresholdConfig, train_scores: &[f64], test_scores: &[f64]) -> Result<f64> {
    match config.policy {
        ThresholdPolicy::MaxTrainingError => max_training_error(train_scores),
        ThresholdPolicy::Percentile => percentile_threshold(test_scores, config.percentile),
    }
}

/// Output of [`detect`]: the prepared inputs next to the flagged records.
#[derive(Debug, Clone)]
pub struct DetectionRun {
    pub inputs: DetectionInputs,
    pub report: DetectionReport,
}

/// Train an autoencoder on the training windows and flag test windows whose
/// reconstruction error exceeds the threshold.
///
/// Record `i` belongs to test point `n_steps + i`, the value right after
/// window `i`.
pub fn detect(series: &PriceSeries, config: &PipelineConfig) -> Result<DetectionRun> {
    let inputs = prepare(series, &config.detector)?;
    let mut model = LstmAutoencoder::new(1, &config.detector, config.seed)?;
    let history = model.fit(&inputs.train.windows)?;

    let kind = config.threshold.policy.score_kind();
    let train_recon = model.predict(&inputs.train.windows)?;
    let test_recon = model.predict(&inputs.test.windows)?;
    let train_scores = window_scores(&inputs.train.windows, &train_recon, kind)?;
    let test_scores = window_scores(&inputs.test.windows, &test_recon, kind)?;

    let threshold = select_threshold(&config.threshold, &train_scores, &test_scores)?;
    let rmse = reconstruction_rmse(&inputs.test.windows, &test_recon)?;

    let n_steps = config.detector.n_steps;
    let timestamps = inputs.split.test.timestamps();
    let prices = inputs.scaler.inverse(&inputs.test.targets.to_vec());
    let records = build_records(&timestamps[n_steps..], &prices, &test_scores, threshold)?;

    let report = DetectionReport {
        records,
        threshold,
        policy: config.threshold.policy,
        score_kind: kind,
        reconstruction_rmse: rmse,
        history,
    };
    info!(
        policy = ?report.policy,
        threshold,
        anomalies = report.anomaly_count(),
        records = report.records.len(),
        reconstruction_rmse = rmse,
        "detection finished"
    );

    Ok(DetectionRun { inputs, report })
}
