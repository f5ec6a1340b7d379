//! Recurrent autoencoder that learns to reproduce windows of a scaled series.
//!
//! Windows the model reconstructs poorly are candidates for anomalies; see
//! [`crate::detection::threshold`] for turning reconstruction errors into flags.

mod layers;
mod model;
mod optimizer;

pub use model::LstmAutoencoder;

use ndarray::Array3;
use serde::Serialize;

use crate::error::Result;

/// Per-epoch losses recorded while fitting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingHistory {
    /// Mean training loss of each epoch.
    pub loss: Vec<f64>,
    /// Loss on the held-out tail of the training windows; empty when no
    /// windows were held out.
    pub val_loss: Vec<f64>,
}

impl TrainingHistory {
    pub fn final_loss(&self) -> Option<f64> {
        self.loss.last().copied()
    }
}

/// A model mapping `(samples, n_steps, n_features)` windows to
/// reconstructions of the same shape.
///
/// This trait is object-safe and can be used with `Box<dyn SequenceReconstructor>`.
pub trait SequenceReconstructor {
    /// Train on windows, returning the loss history.
    fn fit(&mut self, windows: &Array3<f64>) -> Result<TrainingHistory>;

    /// Reconstruct windows deterministically.
    ///
    /// # Errors
    /// `InvalidShape` if the window length or feature count differs from the
    /// model's, `FitRequired` before training.
    fn predict(&self, windows: &Array3<f64>) -> Result<Array3<f64>>;

    fn n_steps(&self) -> usize;

    fn n_features(&self) -> usize;

    fn is_fitted(&self) -> bool;
}
