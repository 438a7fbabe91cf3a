use thiserror::Error;

/// Everything that can abort a report cycle. No partial report is produced
/// when one of these is returned.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Request(#[from] request::RequestError),

    #[error(transparent)]
    ApiClient(#[from] api_client::error::ApiError),

    #[error("Unusable result rows: {0}")]
    Results(#[from] core_types::CoreError),

    #[error("Failed to group results: {0}")]
    Grouping(#[from] polars::prelude::PolarsError),

    #[error("Report export error: {0}")]
    Export(#[from] report::ExportError),
}
