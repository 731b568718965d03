//! CSV ingestion into [`RawBatch`]es.
//!
//! Spreadsheet exports are expected to be saved as CSV first. Rows may have
//! ragged lengths; a short row only fails later if a required column is
//! past its end.

use std::path::Path;

use tracing::debug;

use crate::config::{ReconConfig, SourceConfig};
use crate::error::ReconError;
use crate::model::{RawBatch, ReconInput};

/// Read every file named in the config, relative to `base_dir`.
pub fn load_input(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, ReconError> {
    let sources = &config.sources;
    let bank = match &sources.bank {
        Some(bank) => load_files(bank, base_dir)?,
        None => Vec::new(),
    };
    Ok(ReconInput {
        collection: load_files(&sources.collection, base_dir)?,
        settlement: load_files(&sources.settlement, base_dir)?,
        bank,
    })
}

fn load_files<C>(source: &SourceConfig<C>, base_dir: &Path) -> Result<Vec<RawBatch>, ReconError> {
    source
        .files
        .iter()
        .map(|file| {
            let path = base_dir.join(file);
            let data = std::fs::read_to_string(&path)
                .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
            let batch = load_csv_batch(file, &data, source.has_headers)?;
            debug!(file = %path.display(), rows = batch.rows.len(), "loaded batch");
            Ok(batch)
        })
        .collect()
}

/// Parse CSV text into a raw batch named `name`.
pub fn load_csv_batch(name: &str, csv_data: &str, has_headers: bool) -> Result<RawBatch, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(csv_data.trim_start_matches('\u{feff}').as_bytes());

    let headers: Vec<String> = if has_headers {
        reader
            .headers()
            .map_err(|e| ReconError::Io(format!("{name}: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(format!("{name}: {e}")))?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(RawBatch {
        name: name.to_string(),
        headers,
        rows,
    })
}
