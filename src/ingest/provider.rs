//! Sources of raw `(timestamp, value)` rows.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// One row as delivered by a provider, before any parsing or cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub timestamp: String,
    /// Missing or non-numeric cells become `None`.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub value: Option<f64>,
}

impl RawObservation {
    pub fn new(timestamp: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// Capability to fetch the raw rows of a named series.
pub trait SeriesProvider {
    /// Fetch every row of `series_id` in provider order.
    fn fetch(&self, series_id: &str) -> Result<Vec<RawObservation>>;
}

/// Reads `<dir>/<series_id>.csv` files with a `timestamp,value` header.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, series_id: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", series_id))
    }
}

impl SeriesProvider for CsvProvider {
    fn fetch(&self, series_id: &str) -> Result<Vec<RawObservation>> {
        let path = self.path_for(series_id);
        debug!(path = %path.display(), "reading series file");

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: RawObservation = record?;
            rows.push(row);
        }
        Ok(rows)
    }
}

/// In-memory provider, keyed by series id.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    series: HashMap<String, Vec<RawObservation>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series_id: impl Into<String>, rows: Vec<RawObservation>) -> Self {
        self.series.insert(series_id.into(), rows);
        self
    }
}

impl SeriesProvider for StaticProvider {
    fn fetch(&self, series_id: &str) -> Result<Vec<RawObservation>> {
        self.series
            .get(series_id)
            .cloned()
            .ok_or_else(|| PipelineError::DataUnavailable(format!("unknown series {}", series_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_provider_reads_missing_cells_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("HH.csv")).unwrap();
        writeln!(file, "timestamp,value\n2020-01-01,2.1\n2020-01-02,\n2020-01-03,NA\n2020-01-06, 2.4").unwrap();

        let rows = CsvProvider::new(dir.path()).fetch("HH").unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], RawObservation::new("2020-01-01", Some(2.1)));
        assert_eq!(rows[1].value, None);
        assert_eq!(rows[2].value, None);
        assert_eq!(rows[3].value, Some(2.4));
    }

    #[test]
    fn csv_provider_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvProvider::new(dir.path()).fetch("absent").is_err());
    }

    #[test]
    fn static_provider_unknown_series() {
        let provider = StaticProvider::new().with_series("a", vec![]);
        assert!(provider.fetch("a").unwrap().is_empty());
        assert!(matches!(
            provider.fetch("b"),
            Err(PipelineError::DataUnavailable(_))
        ));
    }
}
