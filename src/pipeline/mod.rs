//! End-to-end runs: ingestion feeding the anomaly detector and the seasonal
//! forecaster, plus CSV export of their records.

mod detect;
mod forecast;
mod report;

pub use detect::{detect, prepare, select_threshold, DetectionInputs, DetectionRun};
pub use forecast::{forecast, ForecastEvaluation, ForecastRecord, ForecastReport};
pub use report::{export_csv, write_records};

use std::path::Path;

use tracing::info;

use crate::config::PipelineConfig;
use crate::core::PriceSeries;
use crate::error::Result;
use crate::ingest::{ingest, require_data, SeriesProvider};

/// File name of the exported anomaly records.
pub const ANOMALIES_FILE: &str = "anomalies.csv";
/// File name of the exported forecast records.
pub const FORECAST_FILE: &str = "forecast.csv";

/// Results of both data flows over one series.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub detection: DetectionRun,
    pub forecast: ForecastReport,
}

impl RunOutput {
    /// Write both record sets into `dir`.
    pub fn export(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        export_csv(&dir.join(ANOMALIES_FILE), &self.detection.report.records)?;
        export_csv(&dir.join(FORECAST_FILE), &self.forecast.records)?;
        Ok(())
    }
}

/// Fetch and clean the configured series; an empty result ends the run.
pub fn load_series<P>(provider: &P, config: &PipelineConfig) -> Result<PriceSeries>
where
    P: SeriesProvider + ?Sized,
{
    let series = ingest(provider, &config.ingest.series_id, config.ingest.start_date);
    require_data(&series)?;
    if let Some(stats) = series.describe() {
        info!(
            count = stats.count,
            min = stats.min,
            max = stats.max,
            mean = stats.mean,
            q1 = stats.q1,
            median = stats.median,
            q3 = stats.q3,
            "series summary"
        );
    }
    Ok(series)
}

/// Ingest once, then detect anomalies and forecast the holdout.
pub fn run<P>(provider: &P, config: &PipelineConfig) -> Result<RunOutput>
where
    P: SeriesProvider + ?Sized,
{
    let series = load_series(provider, config)?;
    let detection = detect(&series, config)?;
    let forecast = forecast(&series, config)?;
    Ok(RunOutput {
        detection,
        forecast,
    })
}
