//! Anomaly flags joined back to dates and original-scale prices.

use chrono::NaiveDate;
use serde::Serialize;

use super::autoencoder::TrainingHistory;
use super::score::ScoreKind;
use super::threshold::{is_anomaly, ThresholdPolicy};
use crate::error::{PipelineError, Result};

/// Decision for one test window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyRecord {
    pub timestamp: NaiveDate,
    /// Reconstruction error of the window.
    pub loss: f64,
    pub threshold: f64,
    pub is_anomaly: bool,
    /// Price in original units.
    pub price: f64,
}

/// Build one record per score; the three slices are aligned by index.
pub fn build_records(
    timestamps: &[NaiveDate],
    prices: &[f64],
    scores: &[f64],
    threshold: f64,
) -> Result<Vec<AnomalyRecord>> {
    if timestamps.len() != scores.len() || prices.len() != scores.len() {
        return Err(PipelineError::InvalidShape {
            expected: format!("{} timestamps and prices", scores.len()),
            got: format!("{} timestamps, {} prices", timestamps.len(), prices.len()),
        });
    }
    Ok(timestamps
        .iter()
        .zip(prices)
        .zip(scores)
        .map(|((&timestamp, &price), &loss)| AnomalyRecord {
            timestamp,
            loss,
            threshold,
            is_anomaly: is_anomaly(loss, threshold),
            price,
        })
        .collect())
}

/// Outcome of a detection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
    pub records: Vec<AnomalyRecord>,
    pub threshold: f64,
    pub policy: ThresholdPolicy,
    pub score_kind: ScoreKind,
    /// RMSE between test windows and their reconstructions, in scaled units.
    pub reconstruction_rmse: f64,
    pub history: TrainingHistory,
}

impl DetectionReport {
    /// Records flagged as anomalous.
    pub fn anomalies(&self) -> impl Iterator<Item = &AnomalyRecord> {
        self.records.iter().filter(|r| r.is_anomaly)
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies().count()
    }

    /// Share of records flagged, in percent.
    pub fn anomaly_percentage(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            100.0 * self.anomaly_count() as f64 / self.records.len() as f64
        }
    }
}
