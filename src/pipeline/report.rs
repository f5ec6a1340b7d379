//! CSV export of result records.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::Writer;
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Serialize `records` with a header row into `writer`, returning it.
pub fn write_records<W, T>(writer: W, records: &[T]) -> Result<W>
where
    W: Write,
    T: Serialize,
{
    let mut wtr = Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| PipelineError::Io(format!("CSV writer error: {}", e)))
}

/// Write `records` to a CSV file at `path`.
pub fn export_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = File::create(path)?;
    write_records(file, records)?;
    info!(path = %path.display(), rows = records.len(), "records exported");
    Ok(())
}
