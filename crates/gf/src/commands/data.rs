//! Reading row data and filter models from files.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use gridfilter::model::FilterModel;
use gridfilter::value::Row;
use serde_json::Value;

use super::{CommandError, Result};

/// A filter model read from a file, either bare or inside an export envelope.
#[derive(Debug)]
pub enum ModelInput {
    /// A bare filter model object.
    Model(FilterModel),
    /// An exported envelope, kept as text for `import_filter_model`.
    Envelope(String),
}

/// Reads a file, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(fs::read_to_string(path)?)
}

/// Parses row data: a JSON array of objects, or an object with a `rows` array.
pub fn parse_rows(text: &str) -> Result<Vec<Row>> {
    let value: Value = serde_json::from_str(text)?;
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("rows") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(CommandError::Input(
                    "expected an array of rows or an object with a 'rows' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(CommandError::Input(
                "expected an array of rows or an object with a 'rows' array".to_string(),
            ))
        }
    };

    if let Some(position) = rows.iter().position(|row| !row.is_object()) {
        return Err(CommandError::Input(format!(
            "row {} is not a JSON object",
            position
        )));
    }
    Ok(rows)
}

/// Loads rows from a data file.
pub fn load_rows(path: &Path) -> Result<Vec<Row>> {
    parse_rows(&read_input(path)?)
}

/// Parses a filter model, detecting export envelopes by their `filterModel` key.
pub fn parse_model(text: &str) -> Result<ModelInput> {
    let value: Value = serde_json::from_str(text)?;
    if value.get("filterModel").is_some() {
        return Ok(ModelInput::Envelope(text.to_string()));
    }
    let model: FilterModel = serde_json::from_value(value)
        .map_err(|e| CommandError::Input(format!("invalid filter model: {}", e)))?;
    Ok(ModelInput::Model(model))
}

/// Loads a filter model file.
pub fn load_model(path: &Path) -> Result<ModelInput> {
    parse_model(&read_input(path)?)
}
