//! Error types for dugout-server
//!
//! `ApiError` is what handlers return; it renders the JSON error envelope.
//! Generation backend failures never reach this type: once a stream has
//! started they end the transmission instead (see `generation::relay`).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream data source unreachable or unparsable (502)
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// Record store failure (500)
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// dugout-common error
    #[error("Common error: {0}")]
    Common(dugout_common::Error),
}

impl From<dugout_common::Error> for ApiError {
    fn from(err: dugout_common::Error) -> Self {
        match err {
            dugout_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            dugout_common::Error::Database(e) => ApiError::Store(e),
            other => ApiError::Common(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::UpstreamFetch(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_FETCH_FAILED", msg),
            ApiError::Store(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
