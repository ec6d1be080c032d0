//! Datasets from JSON records
//!
//! Accepts an array of objects, one per row, as posted by a report front end:
//! `[{"Month": "Jan", "Revenue": 10}, ...]`.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::{Dataset, Scalar};

/// JSON record errors
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected an array of objects, found {0}")]
    Shape(&'static str),
}

/// Result type for record operations
pub type RecordsResult<T> = std::result::Result<T, RecordsError>;

/// Build a dataset from parsed JSON records
///
/// Columns appear in first-seen order (keys within one record sorted); a key missing from a
/// record is null for that row.
/// Nested arrays and objects are kept as their JSON text.
pub fn dataset_from_json(value: Value) -> RecordsResult<Dataset> {
    let rows = match value {
        Value::Array(rows) => rows,
        other => return Err(RecordsError::Shape(json_type(&other))),
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let object = match row {
            Value::Object(object) => object,
            other => return Err(RecordsError::Shape(json_type(&other))),
        };
        records.push(
            object
                .into_iter()
                .map(|(key, value)| (key, scalar_from_json(value)))
                .collect::<Vec<_>>(),
        );
    }

    Ok(Dataset::from_records(records))
}

/// Parse JSON text into a dataset
pub fn parse_records(json: &str) -> RecordsResult<Dataset> {
    dataset_from_json(serde_json::from_str(json)?)
}

/// Load a JSON records file into a dataset
pub fn load_records<P: AsRef<Path>>(path: P) -> RecordsResult<Dataset> {
    parse_records(&fs::read_to_string(path)?)
}

fn scalar_from_json(value: Value) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Boolean(b),
        Value::Number(n) => n.as_f64().map_or(Scalar::Null, Scalar::Number),
        Value::String(s) => Scalar::Text(s),
        nested @ (Value::Array(_) | Value::Object(_)) => Scalar::Text(nested.to_string()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
