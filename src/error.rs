//! Error types for the spot-anomaly pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while ingesting, modelling or forecasting a series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The data provider failed or returned no usable rows.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Window or feature dimensions do not match the detector's contract.
    #[error("invalid shape: expected {expected}, got {got}")]
    InvalidShape { expected: String, got: String },

    /// The seasonal model solver exhausted its iteration budget.
    #[error("solver did not converge after {iterations} iterations (criterion {criterion:.6e})")]
    NonConvergence { iterations: usize, criterion: f64 },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading or writing an artifact failed.
    #[error("i/o error: {0}")]
    Io(String),
}

impl PipelineError {
    /// Shape mismatch helper for `(samples, steps, features)` style shapes.
    pub(crate) fn shape(expected: impl Into<String>, got: &[usize]) -> Self {
        PipelineError::InvalidShape {
            expected: expected.into(),
            got: format!("{:?}", got),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}
