//! The flat metadata table (`dataset_metadata.csv`).

use super::record::TrainingRecord;
use crate::error::CorpusError;
use std::path::Path;

/// Write every record as one CSV row, with a header, replacing any existing file.
pub fn write_metadata(path: &Path, records: &[TrainingRecord]) -> Result<usize, CorpusError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(records.len())
}

/// Read records back from a metadata table.
pub fn read_metadata(path: &Path) -> Result<Vec<TrainingRecord>, CorpusError> {
    if !path.exists() {
        return Err(CorpusError::not_found(format!(
            "metadata table {}",
            path.display()
        )));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize::<TrainingRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}
