//! Loading the observed outbreak sizes.
//!
//! The input is a header-less CSV file whose first column holds one outbreak size per row. Other
//! columns are ignored, as are rows whose first cell is empty.

use std::path::Path;

use csv::ReaderBuilder;

use crate::error::OutbreakError;

/// Reads the observed outbreak sizes from `path`.
///
/// # Errors
/// - `OutbreakError::IoError` or `OutbreakError::CsvError` if the file cannot be read.
/// - `OutbreakError::InvalidInput` naming the line of a value that is not a non-negative whole
///   number, or if the file holds no values at all.
pub fn load_observed_sizes(path: &Path) -> Result<Vec<u64>, OutbreakError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut sizes = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);
        match record.get(0) {
            None | Some("") => {}
            Some(cell) => sizes.push(parse_size(cell).ok_or_else(|| {
                OutbreakError::InvalidInput(format!(
                    "{}:{line}: '{cell}' is not an outbreak size",
                    path.display()
                ))
            })?),
        }
    }

    if sizes.is_empty() {
        return Err(OutbreakError::InvalidInput(format!(
            "{} contains no outbreak sizes",
            path.display()
        )));
    }
    Ok(sizes)
}

/// A non-negative whole number, written either as an integer or as an integral float (`12.0`).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_size(cell: &str) -> Option<u64> {
    if let Ok(size) = cell.parse::<u64>() {
        return Some(size);
    }
    let value = cell.parse::<f64>().ok()?;
    let whole = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
    (whole && value < 2f64.powi(53)).then_some(value as u64)
}
