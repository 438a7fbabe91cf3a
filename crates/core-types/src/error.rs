use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Unrecognised range label '{0}' (expected e.g. \"High 1\" or \"Low 2\")")]
    InvalidRangeLabel(String),

    #[error("Failed to encode result rows: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to build result table: {0}")]
    Frame(#[from] polars::prelude::PolarsError),
}
