//! Pipeline configuration.
//!
//! Every tunable of a run lives in [`PipelineConfig`]. Values come from the
//! built-in defaults, an optional configuration file and `SPOT_ANOMALY__*`
//! environment variables, in increasing order of precedence:
//!
//! ```text
//! SPOT_ANOMALY__DETECTOR__EPOCHS=5
//! SPOT_ANOMALY__THRESHOLD__POLICY=percentile
//! ```

use std::path::Path;

use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::detection::ThresholdPolicy;
use crate::error::{PipelineError, Result};
use crate::models::arima::{ArimaOrder, SeasonalOrder};

const ENV_PREFIX: &str = "SPOT_ANOMALY";

/// Configuration of a complete detection and forecasting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ingest: IngestConfig,
    pub detector: DetectorConfig,
    pub threshold: ThresholdConfig,
    pub forecast: ForecastConfig,
    pub stationarity: StationarityConfig,
    /// Seed for every randomised step: weight init, dropout masks.
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            detector: DetectorConfig::default(),
            threshold: ThresholdConfig::default(),
            forecast: ForecastConfig::default(),
            stationarity: StationarityConfig::default(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub series_id: String,
    /// Observations dated before this day are discarded.
    pub start_date: NaiveDate,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            series_id: "NG.RNGWHHD.D".to_string(),
            start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
        }
    }
}

/// Training objective of the autoencoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    MeanAbsoluteError,
    MeanSquaredError,
}

/// Adam hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Window length fed to the autoencoder.
    pub n_steps: usize,
    pub train_fraction: f64,
    pub hidden_units: usize,
    pub dropout: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of training windows, taken from the end, used for validation loss.
    pub validation_split: f64,
    pub optimizer: AdamConfig,
    pub loss: LossKind,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            n_steps: 30,
            train_fraction: 0.95,
            hidden_units: 64,
            dropout: 0.2,
            epochs: 20,
            batch_size: 32,
            validation_split: 0.1,
            optimizer: AdamConfig::default(),
            loss: LossKind::MeanAbsoluteError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub policy: ThresholdPolicy,
    /// Quantile in `[0, 1]` used by the percentile policy.
    pub percentile: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            policy: ThresholdPolicy::MaxTrainingError,
            percentile: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of trailing observations held out for evaluation.
    pub holdout: usize,
    pub order: ArimaOrder,
    pub seasonal_order: SeasonalOrder,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            holdout: 60,
            order: ArimaOrder::new(1, 1, 1),
            seasonal_order: SeasonalOrder::new(1, 0, 0, 1),
            max_iterations: 2000,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationarityConfig {
    pub significance: f64,
    /// Upper bound for the lag search; `None` uses `12 * (n / 100)^(1/4)`.
    pub max_lags: Option<usize>,
}

impl Default for StationarityConfig {
    fn default() -> Self {
        Self {
            significance: 0.05,
            max_lags: None,
        }
    }
}

impl PipelineConfig {
    /// Load defaults overlaid with an optional file and the environment.
    ///
    /// A missing file is not an error; the defaults and environment apply.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.as_ref().display(), "reading configuration file");
            builder = builder.add_source(File::from(path.as_ref()).required(false));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let parsed: PipelineConfig = config.try_deserialize()?;
        parsed.validate()?;
        info!(
            series_id = %parsed.ingest.series_id,
            seed = parsed.seed,
            "configuration loaded"
        );
        Ok(parsed)
    }

    /// Check every field against its domain.
    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        if d.n_steps == 0 {
            return Err(invalid("detector.n_steps must be positive"));
        }
        if !(d.train_fraction > 0.0 && d.train_fraction < 1.0) {
            return Err(invalid("detector.train_fraction must be in (0, 1)"));
        }
        if d.hidden_units == 0 || d.batch_size == 0 || d.epochs == 0 {
            return Err(invalid(
                "detector.hidden_units, batch_size and epochs must be positive",
            ));
        }
        if !(0.0..1.0).contains(&d.dropout) {
            return Err(invalid("detector.dropout must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&d.validation_split) {
            return Err(invalid("detector.validation_split must be in [0, 1)"));
        }
        let adam = &d.optimizer;
        if adam.learning_rate <= 0.0
            || !(0.0..1.0).contains(&adam.beta1)
            || !(0.0..1.0).contains(&adam.beta2)
            || adam.epsilon <= 0.0
        {
            return Err(invalid("detector.optimizer has out-of-range Adam parameters"));
        }
        if !(0.0..=1.0).contains(&self.threshold.percentile) {
            return Err(invalid("threshold.percentile must be in [0, 1]"));
        }
        if self.forecast.holdout < 2 {
            return Err(invalid("forecast.holdout must be at least 2"));
        }
        if self.forecast.seasonal_order.period == 0 {
            return Err(invalid("forecast.seasonal_order.period must be positive"));
        }
        if self.forecast.max_iterations == 0 || self.forecast.tolerance <= 0.0 {
            return Err(invalid(
                "forecast.max_iterations and tolerance must be positive",
            ));
        }
        if !(self.stationarity.significance > 0.0 && self.stationarity.significance < 1.0) {
            return Err(invalid("stationarity.significance must be in (0, 1)"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> PipelineError {
    PipelineError::InvalidParameter(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.detector.n_steps, 30);
        assert_eq!(config.detector.hidden_units, 64);
        assert_eq!(config.detector.epochs, 20);
        assert_eq!(config.detector.loss, LossKind::MeanAbsoluteError);
        assert_eq!(config.forecast.holdout, 60);
        assert_eq!(config.forecast.order, ArimaOrder::new(1, 1, 1));
        assert_eq!(config.threshold.policy, ThresholdPolicy::MaxTrainingError);
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let mut config = PipelineConfig::default();
        config.threshold.percentile = 1.5;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidParameter(_))
        ));

        let mut config = PipelineConfig::default();
        config.detector.dropout = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.detector.train_fraction = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "seed = 7\n\n[detector]\nepochs = 3\nn_steps = 10\n\n[threshold]\npolicy = \"percentile\"\npercentile = 0.9"
        )
        .unwrap();

        let config = PipelineConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.detector.epochs, 3);
        assert_eq!(config.detector.n_steps, 10);
        assert_eq!(config.detector.hidden_units, 64);
        assert_eq!(config.threshold.policy, ThresholdPolicy::Percentile);
        assert!((config.threshold.percentile - 0.9).abs() < 1e-12);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = PipelineConfig::load(Some("/nonexistent/spot-anomaly.toml")).unwrap();
        assert_eq!(config.detector.n_steps, 30);
    }
}
