use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to build the HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("The API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("The API request timed out after {0} seconds")]
    Timeout(u64),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),
}
