//! Per-window reconstruction errors.

use ndarray::{Array3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// How a window's reconstruction error is reduced to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Mean absolute error over timesteps and features.
    MeanAbsoluteError,
    /// Euclidean norm of the error over timesteps and features.
    EuclideanDistance,
}

fn check_same_shape(actual: &Array3<f64>, reconstructed: &Array3<f64>) -> Result<()> {
    if actual.shape() != reconstructed.shape() {
        return Err(PipelineError::shape(
            format!("{:?}", actual.shape()),
            reconstructed.shape(),
        ));
    }
    Ok(())
}

/// One score per window, in window order.
pub fn window_scores(actual: &Array3<f64>, reconstructed: &Array3<f64>, kind: ScoreKind) -> Result<Vec<f64>> {
    check_same_shape(actual, reconstructed)?;
    let scores = actual
        .axis_iter(Axis(0))
        .zip(reconstructed.axis_iter(Axis(0)))
        .map(|(a, r)| {
            let mut abs_sum = 0.0;
            let mut sq_sum = 0.0;
            Zip::from(&a).and(&r).for_each(|x, y| {
                let d = x - y;
                abs_sum += d.abs();
                sq_sum += d * d;
            });
            match kind {
                ScoreKind::MeanAbsoluteError => abs_sum / a.len() as f64,
                ScoreKind::EuclideanDistance => sq_sum.sqrt(),
            }
        })
        .collect();
    Ok(scores)
}

pub fn window_mae(actual: &Array3<f64>, reconstructed: &Array3<f64>) -> Result<Vec<f64>> {
    window_scores(actual, reconstructed, ScoreKind::MeanAbsoluteError)
}

pub fn window_distance(actual: &Array3<f64>, reconstructed: &Array3<f64>) -> Result<Vec<f64>> {
    window_scores(actual, reconstructed, ScoreKind::EuclideanDistance)
}

/// Root-mean-squared error over every timestep of every window.
pub fn reconstruction_rmse(actual: &Array3<f64>, reconstructed: &Array3<f64>) -> Result<f64> {
    check_same_shape(actual, reconstructed)?;
    if actual.is_empty() {
        return Err(PipelineError::InsufficientData { needed: 1, got: 0 });
    }
    let sq: f64 = Zip::from(actual)
        .and(reconstructed)
        .fold(0.0, |acc, a, r| acc + (a - r).powi(2));
    Ok((sq / actual.len() as f64).sqrt())
}
