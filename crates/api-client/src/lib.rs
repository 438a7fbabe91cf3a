use crate::error::ApiError;
use async_trait::async_trait;
use configuration::ServiceConfig;
use core_types::QueryRequest;
use std::time::Duration;

pub mod error;
pub mod responses;
// --- Public API ---
pub use responses::QueryResponse;

/// The abstract interface to the remote analytics service.
///
/// The report engine only talks to this trait, so the HTTP implementation can
/// be swapped for a mock in tests.
#[async_trait]
pub trait AnalyticsClient: Send + Sync {
    /// Submits one traveler query and returns the raw result set.
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError>;
}

/// `AnalyticsClient` over HTTP: the request is POSTed as JSON to the
/// configured endpoint.
#[derive(Clone)]
pub struct HttpAnalyticsClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpAnalyticsClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ApiError> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout.as_secs())
        } else {
            ApiError::Transport(err)
        }
    }
}

#[async_trait]
impl AnalyticsClient for HttpAnalyticsClient {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            asset = %request.asset_id,
            ranges = request.custom_ranges.len(),
            measurements = request.measurements.len(),
            "Submitting traveler query."
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Analytics service rejected the query.");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str::<QueryResponse>(&text)
            .map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}
