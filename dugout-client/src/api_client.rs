//! dugout-server HTTP client

use async_trait::async_trait;
use dugout_common::{GenerationRequest, Record, RecordUpdate};
use futures::StreamExt;
use serde::{de::DeserializeOwned, Deserialize};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::transport::{ByteStream, Transport};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5050";

/// Response of `POST /api/records/fetch`
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSummary {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Client for the record and generation endpoints
///
/// Also the production `Transport` for the stream consumer.
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(base_url));
        }

        // No overall timeout: generation responses stay open while text streams
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /api/records
    pub async fn list_records(&self) -> ClientResult<Vec<Record>> {
        let response = self
            .http_client
            .get(self.url("/api/records"))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        read_json(response).await
    }

    /// POST /api/records/fetch
    pub async fn fetch_records(&self) -> ClientResult<FetchSummary> {
        let response = self
            .http_client
            .post(self.url("/api/records/fetch"))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        read_json(response).await
    }

    /// PUT /api/records/{id}
    pub async fn update_record(&self, id: Uuid, changes: &RecordUpdate) -> ClientResult<Record> {
        let response = self
            .http_client
            .put(self.url(&format!("/api/records/{}", id)))
            .json(changes)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        read_json(response).await
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn open(&self, request: &GenerationRequest) -> Result<ByteStream, ClientError> {
        tracing::debug!(record_id = %request.id, "Opening generation stream");

        let response = self
            .http_client
            .post(self.url("/api/records/generate"))
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let response = check_status(response).await?;

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ClientError::Network(e.to_string()))
        });

        Ok(Box::pin(body))
    }
}

async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

/// Build an `Api` error from a status and the server's error envelope
fn api_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ClientError::Api {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => ClientError::Api {
            status,
            code: "UNKNOWN".to_string(),
            message: body.to_string(),
        },
    }
}
