use thiserror::Error;

/// Validation failures raised while preparing a query. All of them are
/// reported before any remote call is attempted.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Please enable at least one custom range with a center value above zero")]
    NoActiveRange,

    #[error("Custom range '{0}' was supplied more than once")]
    DuplicateRange(String),

    #[error("Please select at least one timeframe")]
    NoTimeframe,

    #[error("Scope must be between {min} and {max} days, got {value}")]
    ScopeOutOfBounds { value: u32, min: u32, max: u32 },

    #[error("Error loading measurements: {0}")]
    MeasurementLoad(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RequestError {
    pub(crate) fn measurement_load<E>(cause: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        RequestError::MeasurementLoad(cause.into())
    }
}
