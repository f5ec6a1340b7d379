//! Decision thresholds over reconstruction errors.

use serde::{Deserialize, Serialize};

use super::score::ScoreKind;
use crate::error::{PipelineError, Result};

/// How the anomaly threshold is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Largest per-window MAE seen on the training windows.
    MaxTrainingError,
    /// A percentile of the per-window Euclidean distances on the test windows.
    Percentile,
}

impl ThresholdPolicy {
    /// Score unit the threshold is expressed in.
    pub fn score_kind(self) -> ScoreKind {
        match self {
            ThresholdPolicy::MaxTrainingError => ScoreKind::MeanAbsoluteError,
            ThresholdPolicy::Percentile => ScoreKind::EuclideanDistance,
        }
    }
}

/// Maximum of the training scores.
pub fn max_training_error(train_scores: &[f64]) -> Result<f64> {
    train_scores
        .iter()
        .copied()
        .reduce(f64::max)
        .ok_or(PipelineError::InsufficientData { needed: 1, got: 0 })
}

/// Score at index `floor(percentile * n)` of the ascending scores, clamped
/// to the last one.
pub fn percentile_threshold(scores: &[f64], percentile: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&percentile) {
        return Err(PipelineError::InvalidParameter(format!(
            "percentile must be in [0, 1], got {}",
            percentile
        )));
    }
    if scores.is_empty() {
        return Err(PipelineError::InsufficientData { needed: 1, got: 0 });
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let cut_off = ((percentile * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    Ok(sorted[cut_off])
}

/// Strictly greater than the threshold.
pub fn is_anomaly(score: f64, threshold: f64) -> bool {
    score > threshold
}
