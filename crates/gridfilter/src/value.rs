//! Row access and cell coercion.
//!
//! Rows are JSON objects. Column ids may be dot paths into nested objects
//! (`"user.name"`), and numeric path segments index into arrays.

use std::borrow::Cow;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// A single dataset row.
pub type Row = Value;

static NULL: Value = Value::Null;

/// Reads a column value from a row.
///
/// An exact key match wins over dot-path traversal, so a flat column literally
/// named `"a.b"` is still reachable. Missing values resolve to `null`.
pub fn get_column_value<'a>(row: &'a Value, column_id: &str) -> &'a Value {
    if let Some(value) = row.get(column_id) {
        return value;
    }
    if !column_id.contains('.') {
        return &NULL;
    }

    let mut current = row;
    for segment in column_id.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return &NULL,
        }
    }
    current
}

/// Coerces a cell to text. `null` becomes the empty string.
pub fn as_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Coerces a cell to a finite number.
///
/// JSON numbers and numeric strings convert; everything else is `None`.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Coerces a cell to a local calendar date.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` (and the
/// space-separated form), and numbers as epoch milliseconds.
pub fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis).map(|dt| dt.with_timezone(&Local).date_naive())
        }
        _ => None,
    }
}

/// Parses a date operand or cell string.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Coerces a cell to a boolean.
///
/// Strings `false`, `no`, `0` and blank are false (case-insensitive), any other
/// string is true. Numbers are true when non-zero; `null` is false.
pub fn as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let lower = s.trim().to_lowercase();
            !matches!(lower.as_str(), "" | "false" | "no" | "0")
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}
