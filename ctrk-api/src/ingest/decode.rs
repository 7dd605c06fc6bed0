//! Upload payload decoding
//!
//! Dispatches on the declared format and produces one RawRecord per
//! row/element. Decoding is the only stage of the pipeline with a fatal
//! error: a payload that cannot be parsed at all aborts ingestion before
//! anything touches the store. Per-row oddities (short rows, blank rows,
//! stray value types) are absorbed here or downstream.

use super::types::RawRecord;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::Value;
use std::io::Cursor;
use thiserror::Error;

/// Upload formats accepted by the ingestion pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Excel,
    Json,
}

impl UploadFormat {
    /// Derive the format from an uploaded filename's extension
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())?;
        match ext.as_str() {
            "csv" => Some(UploadFormat::Csv),
            "xlsx" | "xls" => Some(UploadFormat::Excel),
            "json" => Some(UploadFormat::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for UploadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UploadFormat::Csv => "CSV",
            UploadFormat::Excel => "Excel",
            UploadFormat::Json => "JSON",
        };
        f.write_str(name)
    }
}

/// Fatal decode failure: the payload is not parseable as its declared
/// format. The only error that aborts an ingestion run.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid CSV payload: {0}")]
    Csv(String),

    #[error("Invalid Excel payload: {0}")]
    Excel(String),

    #[error("Invalid JSON payload: {0}")]
    Json(String),

    #[error("Invalid JSON structure: expected a list or an object with a 'components' or 'data' array")]
    JsonStructure,

    #[error("Spreadsheet has no sheets")]
    EmptyWorkbook,
}

/// Decode an uploaded payload into raw records
pub fn decode_payload(payload: &[u8], format: UploadFormat) -> Result<Vec<RawRecord>, DecodeError> {
    match format {
        UploadFormat::Csv => decode_csv(payload),
        UploadFormat::Excel => decode_excel(payload),
        UploadFormat::Json => decode_json(payload),
    }
}

/// CSV: header row supplies keys, one RawRecord per data row
///
/// The reader is flexible about per-row field counts; missing cells are
/// simply absent fields. Encoding or quoting corruption is fatal.
fn decode_csv(payload: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(payload);

    let headers = reader
        .headers()
        .map_err(|e| DecodeError::Csv(e.to_string()))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| DecodeError::Csv(e.to_string()))?;
        let mut record = RawRecord::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            record.insert(header, Value::String(cell.to_string()));
        }
        records.push(record);
    }

    Ok(records)
}

/// Excel: first sheet, header row supplies keys
fn decode_excel(payload: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let cursor = Cursor::new(payload.to_vec());
    let mut workbook =
        open_workbook_auto_from_rs(cursor).map_err(|e| DecodeError::Excel(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = sheet_names.first().cloned().ok_or(DecodeError::EmptyWorkbook)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| DecodeError::Excel(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(cell_to_header).collect(),
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::new();
    for row in rows {
        let mut record = RawRecord::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                continue;
            }
            record.insert(header.clone(), cell_to_value(cell));
        }
        records.push(record);
    }

    Ok(records)
}

fn cell_to_header(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Map a spreadsheet cell to a JSON scalar
///
/// Dates are rendered as ISO strings so the date normalizer sees the
/// same text it would get from a CSV export.
fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => {
            // Whole floats are almost always integer cells (years, months)
            if f.fract() == 0.0 && f.abs() < 1e15 {
                Value::from(*f as i64)
            } else {
                Value::from(*f)
            }
        }
        Data::Bool(b) => Value::from(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

/// JSON: array of objects, single object, or an object wrapping a
/// `components` / `data` array
fn decode_json(payload: &[u8]) -> Result<Vec<RawRecord>, DecodeError> {
    let parsed: Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Json(e.to_string()))?;

    let elements: Vec<Value> = match parsed {
        Value::Array(items) => items,
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("components") {
                items.clone()
            } else if let Some(Value::Array(items)) = map.get("data") {
                items.clone()
            } else {
                vec![Value::Object(map)]
            }
        }
        _ => return Err(DecodeError::JsonStructure),
    };

    // Non-object elements carry no fields and fall out as blank rows
    Ok(elements
        .into_iter()
        .map(|element| match element {
            Value::Object(map) => RawRecord::from_object(&map),
            _ => RawRecord::new(),
        })
        .collect())
}
