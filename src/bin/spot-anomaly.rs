//! # spot-anomaly
//!
//! Command-line entry point: detect anomalies in and forecast a daily spot
//! price series read from `<data-dir>/<series-id>.csv`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use spot_anomaly::config::PipelineConfig;
use spot_anomaly::detection::ThresholdPolicy;
use spot_anomaly::ingest::CsvProvider;
use spot_anomaly::pipeline::{self, ANOMALIES_FILE, FORECAST_FILE};

#[derive(Parser)]
#[command(name = "spot-anomaly")]
#[command(about = "Spot price anomaly detection and forecasting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "SPOT_ANOMALY_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding `<series-id>.csv`
    #[arg(short, long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Series to fetch, overriding the configuration
    #[arg(short, long, global = true)]
    series_id: Option<String>,

    /// Threshold policy, overriding the configuration
    #[arg(short, long, global = true, value_enum)]
    policy: Option<PolicyArg>,

    /// Directory for the exported CSV records
    #[arg(short, long, global = true, default_value = "out")]
    out_dir: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Flag anomalous windows with the LSTM autoencoder
    Detect,
    /// Forecast the holdout period with SARIMA
    Forecast,
    /// Run detection and forecasting
    Run,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    MaxTrainingError,
    Percentile,
}

impl From<PolicyArg> for ThresholdPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::MaxTrainingError => ThresholdPolicy::MaxTrainingError,
            PolicyArg::Percentile => ThresholdPolicy::Percentile,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn prepare_out_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(series_id) = cli.series_id {
        config.ingest.series_id = series_id;
    }
    if let Some(policy) = cli.policy {
        config.threshold.policy = policy.into();
    }
    config.validate()?;

    let provider = CsvProvider::new(&cli.data_dir);

    match cli.command {
        Commands::Detect => {
            let series = pipeline::load_series(&provider, &config)?;
            let run = pipeline::detect(&series, &config)?;
            prepare_out_dir(&cli.out_dir)?;
            pipeline::export_csv(&cli.out_dir.join(ANOMALIES_FILE), &run.report.records)?;
            info!(
                anomalies = run.report.anomaly_count(),
                percentage = run.report.anomaly_percentage(),
                "detect finished"
            );
        }
        Commands::Forecast => {
            let series = pipeline::load_series(&provider, &config)?;
            let report = pipeline::forecast(&series, &config)?;
            prepare_out_dir(&cli.out_dir)?;
            pipeline::export_csv(&cli.out_dir.join(FORECAST_FILE), &report.records)?;
            info!(
                rmse_price = report.evaluation.absolute.rmse,
                rmse_log_diff = report.evaluation.stationarized.rmse,
                "forecast finished"
            );
        }
        Commands::Run => {
            let output = pipeline::run(&provider, &config)?;
            output.export(&cli.out_dir)?;
            info!(out_dir = %cli.out_dir.display(), "run finished");
        }
    }

    Ok(())
}
