use chrono::NaiveDate;

use crate::{error::RecordError, record::DrinkRecord};

/// A ready-to-write export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("drink-records-{}.json", date.format("%Y-%m-%d"))
}

pub fn export_json(records: &[DrinkRecord]) -> Result<String, RecordError> {
    serde_json::to_string_pretty(records).map_err(|e| RecordError::Storage(e.to_string()))
}

/// `None` when there is nothing to export.
pub fn export(records: &[DrinkRecord], date: NaiveDate) -> Result<Option<ExportFile>, RecordError> {
    if records.is_empty() {
        log::info!("no records to export");
        return Ok(None);
    }
    Ok(Some(ExportFile {
        file_name: export_file_name(date),
        contents: export_json(records)?,
    }))
}

/// Parses an import payload. The top-level value must be an array and every
/// entry must be a complete record.
pub fn parse_import(text: &str) -> Result<Vec<DrinkRecord>, RecordError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_array() {
        return Err(RecordError::Format(
            "expected a JSON array of records".to_string(),
        ));
    }
    let records: Vec<DrinkRecord> = serde_json::from_value(value)?;
    Ok(records)
}
