//! # spot-anomaly
//!
//! Anomaly detection and short-horizon forecasting for daily commodity spot
//! prices.
//!
//! Two flows share one ingested series:
//! - **Detection**: robust scaling, sliding windows and an LSTM autoencoder
//!   whose reconstruction error is thresholded into [`detection::AnomalyRecord`]s.
//! - **Forecasting**: log-differencing, an augmented Dickey-Fuller report and a
//!   seasonal ARIMA model whose predictions are chained back into prices.
//!
//! See [`pipeline::run`] for the full run and [`config::PipelineConfig`] for
//! every tunable.

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{PipelineError, Result};

pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::core::{Forecast, PriceSeries, TimePoint};
    pub use crate::detection::{AnomalyRecord, LstmAutoencoder, SequenceReconstructor, ThresholdPolicy};
    pub use crate::error::{PipelineError, Result};
    pub use crate::ingest::{CsvProvider, SeriesProvider, StaticProvider};
    pub use crate::models::Forecaster;
    pub use crate::pipeline::{detect, forecast, run, ForecastRecord};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics};
}
