//! Result rows and measurement sheets are held as polars `DataFrame`s. These
//! helpers build frames from the service's JSON rows and pull typed values
//! back out of individual columns.

use crate::error::CoreError;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::{
    AnyValue, Column, DataFrame, DataType, JsonFormat, JsonReader, NamedFrom, PolarsResult,
    SerReader, TimeUnit,
};
use serde_json::{Map, Value};
use std::io::Cursor;

/// Unit of every timestamp column created in this workspace.
pub const TIMESTAMP_UNIT: TimeUnit = TimeUnit::Milliseconds;

/// Builds a frame from the service's row objects. Columns follow the key order
/// of the rows; keys missing from a row become nulls.
pub fn frame_from_records(records: &[Map<String, Value>]) -> Result<DataFrame, CoreError> {
    if records.is_empty() {
        return Ok(DataFrame::empty());
    }
    let bytes = serde_json::to_vec(records)?;
    let frame = JsonReader::new(Cursor::new(bytes))
        .with_json_format(JsonFormat::Json)
        .infer_schema_len(None)
        .finish()?;
    Ok(frame)
}

/// A millisecond timestamp column; `None` entries are nulls.
pub fn timestamp_column(name: &str, values: &[Option<NaiveDateTime>]) -> PolarsResult<Column> {
    let millis: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.map(|ts| ts.and_utc().timestamp_millis()))
        .collect();
    Column::new(name.into(), millis).cast(&DataType::Datetime(TIMESTAMP_UNIT, None))
}

/// Reads a datetime column back into chrono values.
pub fn timestamp_values(column: &Column) -> PolarsResult<Vec<Option<NaiveDateTime>>> {
    let millis = column
        .cast(&DataType::Datetime(TIMESTAMP_UNIT, None))?
        .cast(&DataType::Int64)?;
    (0..millis.len())
        .map(|idx| -> PolarsResult<Option<NaiveDateTime>> {
            Ok(match millis.get(idx)? {
                AnyValue::Int64(ms) => DateTime::from_timestamp_millis(ms).map(|d| d.naive_utc()),
                _ => None,
            })
        })
        .collect()
}

/// Numeric reading of a cell. Text is parsed after trimming; non-finite
/// results count as missing.
pub fn numeric_value(value: &AnyValue<'_>) -> Option<f64> {
    let number = match value {
        AnyValue::Float64(v) => *v,
        AnyValue::Float32(v) => f64::from(*v),
        AnyValue::Int64(v) => *v as f64,
        AnyValue::Int32(v) => f64::from(*v),
        AnyValue::Int16(v) => f64::from(*v),
        AnyValue::Int8(v) => f64::from(*v),
        AnyValue::UInt64(v) => *v as f64,
        AnyValue::UInt32(v) => f64::from(*v),
        AnyValue::UInt16(v) => f64::from(*v),
        AnyValue::UInt8(v) => f64::from(*v),
        AnyValue::String(s) => s.trim().parse().ok()?,
        AnyValue::StringOwned(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Display text of a cell; `None` for nulls. Whole floats print without a
/// fractional part.
pub fn text_value(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Boolean(b) => Some(b.to_string()),
        other => Some(match numeric_value(&other) {
            Some(n) => n.to_string(),
            None => other.to_string(),
        }),
    }
}
