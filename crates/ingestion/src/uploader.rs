use crate::error::IngestionError;
use crate::object_key;
use crate::store::ObjectStore;
use configuration::StorageConfig;
use core_types::{Asset, FeedType, Timeframe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One raw feed file and where it belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFile {
    pub path: PathBuf,
    pub asset: Asset,
    pub timeframe: Timeframe,
    pub feed: FeedType,
}

/// Outcome of a batch upload. Failures do not stop the batch.
#[derive(Debug, Default)]
pub struct UploadSummary {
    /// Object keys written, in submission order.
    pub uploaded: Vec<String>,
    pub failed: Vec<(PathBuf, IngestionError)>,
}

impl UploadSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Places raw feed files into the ingestion bucket, where their arrival
/// triggers the downstream ETL.
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn from_config(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self::new(store, config.bucket.clone())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Uploads one file under `{asset}/{timeframe}/{feed}/{file name}` and
    /// returns that key.
    pub async fn upload_file(
        &self,
        path: &Path,
        asset: Asset,
        timeframe: Timeframe,
        feed: FeedType,
    ) -> Result<String, IngestionError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| IngestionError::InvalidFileName(path.to_path_buf()))?;
        let key = object_key(asset, timeframe, feed, file_name);

        let body = tokio::fs::read(path)
            .await
            .map_err(|source| IngestionError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let size = body.len();

        self.store.put_object(&self.bucket, &key, body).await?;
        tracing::info!(bucket = %self.bucket, key = %key, bytes = size, "Uploaded feed file.");
        Ok(key)
    }

    /// Uploads every file in turn, recording each failure and carrying on.
    pub async fn upload_batch(&self, files: &[FeedFile]) -> UploadSummary {
        let mut summary = UploadSummary::default();
        for file in files {
            match self
                .upload_file(&file.path, file.asset, file.timeframe, file.feed)
                .await
            {
                Ok(key) => summary.uploaded.push(key),
                Err(e) => {
                    tracing::error!(path = %file.path.display(), error = %e, "Feed upload failed.");
                    summary.failed.push((file.path.clone(), e));
                }
            }
        }
        summary
    }
}
