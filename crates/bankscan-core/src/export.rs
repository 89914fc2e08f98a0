//! CSV serialization of assembled comparison records.
//!
//! Column layout is stable: identity columns (`type`, `bank`, `product`)
//! first, then one column per canonical criterion in market-config order.
//! Unresolved cells carry the [`NO_DATA`] sentinel, never an empty value,
//! so downstream lookups by (bank, criterion) are always unambiguous.

use std::path::Path;

use thiserror::Error;

use crate::records::{ProductRecord, NO_DATA};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write dataset: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes one row per record to `path` as UTF-8 delimited text.
///
/// # Errors
///
/// Returns [`ExportError::Csv`] if the file cannot be created or a row
/// cannot be written.
pub fn write_csv(
    records: &[ProductRecord],
    criteria: &[String],
    path: &Path,
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = vec!["type", "bank", "product"];
    header.extend(criteria.iter().map(String::as_str));
    writer.write_record(&header)?;

    for record in records {
        let product_type = record.product_type.to_string();
        let mut row: Vec<&str> = vec![&product_type, &record.bank, &record.product_name];
        for criterion in criteria {
            // assemble() guarantees the key exists; guard anyway so a
            // hand-built record can never produce an empty cell.
            row.push(
                record
                    .criteria
                    .get(criterion)
                    .map_or(NO_DATA, String::as_str),
            );
        }
        writer.write_record(&row)?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
