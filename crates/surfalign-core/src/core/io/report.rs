use serde::Serialize;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of the per-template-point matching report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub template_index: usize,
    pub molecule_index: Option<usize>,
    pub weight: f64,
    pub geometric_sq: f64,
    pub feature_sq: f64,
}

pub fn write_matching_report(
    writer: impl Write,
    records: &[MatchRecord],
) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}
