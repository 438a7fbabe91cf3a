use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' has no usable file name")]
    InvalidFileName(PathBuf),

    #[error("Failed to upload '{key}': {message}")]
    Upload { key: String, message: String },
}
