//! # Traveler Report Assembly
//!
//! Turns the raw result table returned by the analytics service into the
//! analyst-facing artifact: arrival timestamps are coerced, rows are sorted
//! and partitioned into named groups, and each non-empty group becomes one
//! sheet of an `.xlsx` workbook.

pub mod error;
pub mod export;
pub mod grouping;
pub mod naming;

pub use error::ExportError;
pub use export::{ExportMetrics, ReportArtifact, ReportExporter, XLSX_MIME};
pub use grouping::{
    coerce_arrival, parse_timestamp, sort_table, TravelerReport, ARRIVAL_COLUMN,
    ARRIVAL_DATETIME_COLUMN, DEFAULT_GROUP, DEFAULT_GROUP_KEY,
};
pub use naming::{artifact_file_name, sheet_name, MAX_SHEET_NAME_CHARS};
