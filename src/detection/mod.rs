//! Reconstruction-based anomaly detection.
//!
//! This module provides:
//! - An LSTM autoencoder behind the [`SequenceReconstructor`] trait
//! - Per-window reconstruction scores
//! - Threshold policies and anomaly records

pub mod autoencoder;
mod records;
mod score;
pub mod threshold;

pub use autoencoder::{LstmAutoencoder, SequenceReconstructor, TrainingHistory};
pub use records::{build_records, AnomalyRecord, DetectionReport};
pub use score::{reconstruction_rmse, window_distance, window_mae, window_scores, ScoreKind};
pub use threshold::{is_anomaly, max_training_error, percentile_threshold, ThresholdPolicy};
