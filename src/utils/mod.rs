//! Numerical helpers shared by the detector, the stationarity test and the
//! seasonal forecaster.

pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use metrics::{calculate_metrics, AccuracyMetrics};
pub use ols::{ols_fit, OlsFit};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{describe, mean, median, quantile, std_dev, variance, DescriptiveStats};
