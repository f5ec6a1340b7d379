//! Series ingestion: fetch raw rows from a provider and clean them.

mod clean;
mod provider;

pub use clean::{clean, parse_timestamp, CleaningReport};
pub use provider::{CsvProvider, RawObservation, SeriesProvider, StaticProvider};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::core::PriceSeries;
use crate::error::{PipelineError, Result};

/// Fetch and clean a series, failing with `DataUnavailable` when the
/// provider errors or nothing usable remains.
pub fn try_ingest<P>(
    provider: &P,
    series_id: &str,
    start: NaiveDate,
) -> Result<(PriceSeries, CleaningReport)>
where
    P: SeriesProvider + ?Sized,
{
    let rows = provider
        .fetch(series_id)
        .map_err(|e| PipelineError::DataUnavailable(format!("{}: {}", series_id, e)))?;
    if rows.is_empty() {
        return Err(PipelineError::DataUnavailable(format!(
            "{}: provider returned no rows",
            series_id
        )));
    }

    let (series, report) = clean(&rows, start)?;
    info!(
        series_id,
        raw_rows = report.raw_rows,
        missing = report.missing_values,
        unparseable = report.unparseable_timestamps,
        before_start = report.before_start,
        duplicates = report.duplicates,
        kept = report.kept,
        "series cleaned"
    );

    if series.is_empty() {
        return Err(PipelineError::DataUnavailable(format!(
            "{}: no usable rows after cleaning",
            series_id
        )));
    }
    Ok((series, report))
}

/// Like [`try_ingest`], but logs the failure and yields an empty series.
///
/// Callers must treat an empty series as fatal for the run; see
/// [`require_data`].
pub fn ingest<P>(provider: &P, series_id: &str, start: NaiveDate) -> PriceSeries
where
    P: SeriesProvider + ?Sized,
{
    match try_ingest(provider, series_id, start) {
        Ok((series, _)) => series,
        Err(e) => {
            warn!(series_id, error = %e, "ingestion failed, continuing with an empty series");
            PriceSeries::empty()
        }
    }
}

/// Reject an empty series before any model stage runs.
pub fn require_data(series: &PriceSeries) -> Result<()> {
    if series.is_empty() {
        Err(PipelineError::DataUnavailable(
            "series is empty".to_string(),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
    }

    #[test]
    fn failing_provider_yields_empty_series() {
        let provider = StaticProvider::new();
        let series = ingest(&provider, "missing", start());
        assert!(series.is_empty());
        assert!(matches!(
            require_data(&series),
            Err(PipelineError::DataUnavailable(_))
        ));
    }

    #[test]
    fn empty_provider_result_is_unavailable() {
        let provider = StaticProvider::new().with_series("HH", vec![]);
        assert!(matches!(
            try_ingest(&provider, "HH", start()),
            Err(PipelineError::DataUnavailable(_))
        ));
    }

    #[test]
    fn all_missing_rows_is_unavailable() {
        let provider = StaticProvider::new()
            .with_series("HH", vec![RawObservation::new("2001-01-01", None)]);
        assert!(try_ingest(&provider, "HH", start()).is_err());
    }

    #[test]
    fn ingest_returns_clean_series() {
        let provider = StaticProvider::new().with_series(
            "HH",
            vec![
                RawObservation::new("2001-01-02", Some(9.9)),
                RawObservation::new("2001-01-03", Some(9.5)),
            ],
        );
        let (series, report) = try_ingest(&provider, "HH", start()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(report.kept, 2);
        assert!(require_data(&series).is_ok());
    }
}
