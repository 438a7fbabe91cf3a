//! # Traveler Query Preparation
//!
//! Everything that happens before the remote call: resolving the analyst's
//! custom-range toggles, normalising the measurement workbook, and assembling
//! the validated [`core_types::QueryRequest`].
//!
//! This is a pure logic crate apart from reading the measurement file; it has
//! no knowledge of the network.

pub mod builder;
pub mod error;
pub mod measurements;
pub mod ranges;

pub use builder::{QueryRequestBuilder, DEFAULT_SCOPE_DAYS, MAX_SCOPE_DAYS, MIN_SCOPE_DAYS};
pub use error::RequestError;
pub use measurements::{
    canonical_column_name, load_measurements, load_measurements_from_bytes,
    normalize_measurements, NAME_COLUMN_SYNONYMS, VALUE_COLUMN_SYNONYMS,
};
pub use ranges::{resolve_ranges, ResolvedRanges};
