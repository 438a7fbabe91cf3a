use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to build the report workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to prepare report data: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("Failed to write the report artifact: {0}")]
    Io(#[from] std::io::Error),
}
