//! Upstream data source client
//!
//! Read-only, unauthenticated HTTP source of raw ranked records.

use async_trait::async_trait;
use dugout_common::RawRecord;
use std::time::Duration;
use thiserror::Error;

use crate::config::UpstreamConfig;

const USER_AGENT: &str = concat!("dugout/", env!("CARGO_PKG_VERSION"));

/// Upstream client errors
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Source of raw records for bulk import
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch one fixed-size batch (no parameters)
    async fn fetch_batch(&self) -> Result<Vec<RawRecord>, UpstreamError>;
}

/// HTTP implementation of `RecordSource`
pub struct HttpRecordSource {
    http_client: reqwest::Client,
    url: String,
    batch_size: usize,
}

impl HttpRecordSource {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| UpstreamError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            batch_size: config.batch_size,
        })
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_batch(&self) -> Result<Vec<RawRecord>, UpstreamError> {
        tracing::debug!(url = %self.url, "Querying upstream source");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| UpstreamError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::ApiError(status.as_u16(), error_text));
        }

        let mut records: Vec<RawRecord> = response
            .json()
            .await
            .map_err(|e| UpstreamError::ParseError(e.to_string()))?;

        records.truncate(self.batch_size);

        tracing::info!(count = records.len(), "Retrieved records from upstream");
        Ok(records)
    }
}
