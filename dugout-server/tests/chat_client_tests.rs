//! ChatCompletionClient against an in-process OpenAI-compatible server

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use dugout_server::config::BackendConfig;
use dugout_server::generation::{GenerationError, TextGenerator};
use dugout_server::services::ChatCompletionClient;
use futures::StreamExt;
use std::time::Duration;

const COMPLETE_BODY: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    ": keep-alive\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"Rogers \"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"Hornsby\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
    "data: [DONE]\n\n",
);

const TRUNCATED_BODY: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Half\"}}]}\n\n";

async fn complete(headers: HeaderMap) -> impl IntoResponse {
    if headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some("Bearer sk-test") {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    ([(header::CONTENT_TYPE, "text/event-stream")], COMPLETE_BODY).into_response()
}

async fn truncated() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/event-stream")], TRUNCATED_BODY)
}

/// Serve a fake backend on an ephemeral port and return its base URL
async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/ok/chat/completions", post(complete))
        .route("/cut/chat/completions", post(truncated));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn client(base_url: String, api_key: &str) -> ChatCompletionClient {
    ChatCompletionClient::new(BackendConfig {
        base_url,
        api_key: Some(api_key.to_string()),
        model: "gpt-3.5-turbo".to_string(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_streams_deltas_until_done_sentinel() {
    let base = spawn_backend().await;
    let client = client(format!("{}/ok", base), "sk-test");

    let stream = match client.stream_completion("prompt").await {
        Ok(stream) => stream,
        Err(e) => panic!("Should open stream: {}", e),
    };
    let items: Vec<_> = stream.collect().await;

    assert_eq!(
        items,
        vec![Ok("Rogers ".to_string()), Ok("Hornsby".to_string())]
    );
}

#[tokio::test]
async fn test_missing_sentinel_is_interrupted() {
    let base = spawn_backend().await;
    let client = client(format!("{}/cut", base), "sk-test");

    let stream = match client.stream_completion("prompt").await {
        Ok(stream) => stream,
        Err(e) => panic!("Should open stream: {}", e),
    };
    let items: Vec<_> = stream.collect().await;

    assert_eq!(
        items,
        vec![Ok("Half".to_string()), Err(GenerationError::Interrupted)]
    );
}

#[tokio::test]
async fn test_rejected_key_is_api_error() {
    let base = spawn_backend().await;
    let client = client(format!("{}/ok", base), "sk-wrong");

    match client.stream_completion("prompt").await {
        Err(GenerationError::Api(status, body)) => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        Err(e) => panic!("Unexpected error: {}", e),
        Ok(_) => panic!("Expected API error"),
    }
}
