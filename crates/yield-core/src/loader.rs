//! CSV dataset loading
//!
//! Reads a headed CSV file into [`RawRow`]s. Short records are padded with
//! empty values so the dataset builder's completeness filter drops them.

use crate::error::DataLoadError;
use crate::models::RawRow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Load every record of a CSV file, failing fast on I/O or parse errors
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<RawRow>, DataLoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DataLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let rows = read_rows(file)?;
    info!(path = %path.display(), rows = rows.len(), "Dataset loaded");
    Ok(rows)
}

/// Parse headed CSV from any reader
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, DataLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .enumerate()
            .map(|(idx, column)| (column, record.get(idx).unwrap_or("")))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}
