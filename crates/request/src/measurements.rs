//! Measurement loading and normalisation.
//!
//! Measurement workbooks are maintained by hand, so the header spelling drifts
//! ("M value", "M_Value", "m_value", ...). A header spelled exactly like one
//! of the accepted synonyms wins, in synonym order; failing that, headers are
//! canonicalised and matched against the same list.

use crate::error::RequestError;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use core_types::{numeric_value, text_value, Measurement};
use polars::prelude::{Column, DataFrame, NamedFrom};
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Accepted spellings of the value column, highest priority first.
pub const VALUE_COLUMN_SYNONYMS: &[&str] = &[
    "M value",
    "M Value",
    "M_Value",
    "m_value",
    "measurement_value",
    "value",
];

/// Accepted spellings of the name column, highest priority first.
pub const NAME_COLUMN_SYNONYMS: &[&str] = &[
    "M Name",
    "M name",
    "M_name",
    "m_name",
    "measurement_name",
    "name",
];

/// Lower-cases a header and folds whitespace and hyphens into underscores,
/// so "M Value", "m-value" and "M_VALUE" all become `m_value`.
pub fn canonical_column_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '\t' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// The column matching `synonyms`: exact spellings first, in synonym order,
/// then canonical spellings in the same order.
fn resolve_column<'a>(frame: &'a DataFrame, synonyms: &[&str]) -> Option<&'a Column> {
    let names = frame.get_column_names_str();
    let exact = synonyms
        .iter()
        .find_map(|synonym| names.iter().position(|name| *name == *synonym));

    let idx = exact.or_else(|| {
        let canonical: Vec<String> = names.iter().map(|n| canonical_column_name(n)).collect();
        synonyms.iter().find_map(|synonym| {
            let wanted = canonical_column_name(synonym);
            canonical.iter().position(|c| *c == wanted)
        })
    })?;
    frame.get_columns().get(idx)
}

/// Extracts measurements from a loosely shaped frame, in row order.
///
/// Rows without a usable numeric value are skipped. Rows without a name get
/// one synthesised from the value (`"M{value}"`).
pub fn normalize_measurements(frame: &DataFrame) -> Result<Vec<Measurement>, RequestError> {
    let Some(values) = resolve_column(frame, VALUE_COLUMN_SYNONYMS) else {
        if frame.height() > 0 {
            tracing::warn!(
                columns = ?frame.get_column_names_str(),
                "No measurement value column found; every row was skipped."
            );
        }
        return Ok(Vec::new());
    };
    let names = resolve_column(frame, NAME_COLUMN_SYNONYMS);

    let mut measurements = Vec::with_capacity(frame.height());
    let mut skipped = 0usize;
    for idx in 0..frame.height() {
        let cell = values.get(idx).map_err(RequestError::measurement_load)?;
        let Some(value) = numeric_value(&cell) else {
            skipped += 1;
            continue;
        };
        let name = match names {
            Some(column) => text_value(column.get(idx).map_err(RequestError::measurement_load)?)
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            None => None,
        };
        measurements.push(match name {
            Some(name) => Measurement::new(name, value),
            None => Measurement::unnamed(value),
        });
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Skipped measurement rows without a numeric value.");
    }
    Ok(measurements)
}

/// Loads measurements from the first worksheet of a workbook on disk.
pub fn load_measurements(path: &Path) -> Result<Vec<Measurement>, RequestError> {
    let workbook = open_workbook_auto(path).map_err(RequestError::measurement_load)?;
    let frame = read_first_sheet(workbook)?;
    let measurements = normalize_measurements(&frame)?;
    tracing::info!(path = %path.display(), count = measurements.len(), "Loaded measurements.");
    Ok(measurements)
}

/// Loads measurements from an in-memory workbook (e.g. an uploaded file).
pub fn load_measurements_from_bytes(bytes: &[u8]) -> Result<Vec<Measurement>, RequestError> {
    let workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(RequestError::measurement_load)?;
    let frame = read_first_sheet(workbook)?;
    normalize_measurements(&frame)
}

fn read_first_sheet<RS: Read + Seek>(mut workbook: Sheets<RS>) -> Result<DataFrame, RequestError> {
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| RequestError::measurement_load("workbook contains no worksheets"))?
        .map_err(RequestError::measurement_load)?;
    range_to_frame(&range)
}

/// First row is the header; every following row is data. Blank headers become
/// `column_{n}` and repeated ones get a numeric suffix.
fn range_to_frame(range: &Range<Data>) -> Result<DataFrame, RequestError> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let body: Vec<&[Data]> = rows.collect();

    let mut seen = HashSet::new();
    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let name = unique_header(cell, idx, &mut seen);
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                .collect();
            column_from_cells(&name, &cells)
        })
        .collect();

    DataFrame::new(columns).map_err(RequestError::measurement_load)
}

fn unique_header(cell: &Data, idx: usize, seen: &mut HashSet<String>) -> String {
    let raw = match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    };
    let base = if raw.is_empty() {
        format!("column_{}", idx + 1)
    } else {
        raw
    };

    let mut name = base.clone();
    let mut suffix = 1;
    while !seen.insert(name.clone()) {
        suffix += 1;
        name = format!("{}_{}", base, suffix);
    }
    name
}

/// A column with only numbers (or gaps) stays numeric; anything else is read
/// as text so hand-typed values like "1.25" still parse later.
fn column_from_cells(name: &str, cells: &[&Data]) -> Column {
    let numeric = cells.iter().all(|cell| {
        matches!(cell, Data::Empty | Data::Error(_) | Data::Float(_) | Data::Int(_))
    });

    if numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Float(f) => Some(*f),
                Data::Int(i) => Some(*i as f64),
                _ => None,
            })
            .collect();
        Column::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells.iter().map(|cell| text_from_data(cell)).collect();
        Column::new(name.into(), values)
    }
}

fn text_from_data(data: &Data) -> Option<String> {
    match data {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(|ts| ts.to_string()),
    }
}
