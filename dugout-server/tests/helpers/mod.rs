//! Shared fixtures for dugout-server integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dugout_common::{FrameDecoder, RawRecord, Record, StreamFrame};
use dugout_server::config::RelayConfig;
use dugout_server::db::{init_database_pool, records};
use dugout_server::generation::{GenerationError, TextGenerator, TokenStream};
use dugout_server::services::{RecordSource, UpstreamError};
use dugout_server::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;
use uuid::Uuid;

/// Backend that replays a fixed script and counts calls
pub struct ScriptedGenerator {
    pub items: Vec<Result<String, GenerationError>>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(items: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            items,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn tokens(tokens: &[&str]) -> Self {
        Self::new(tokens.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn stream_completion(&self, prompt: &str) -> Result<TokenStream, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(Box::pin(futures::stream::iter(self.items.clone())))
    }
}

/// Upstream source returning a fixed batch
pub struct StaticSource(pub Vec<RawRecord>);

#[async_trait]
impl RecordSource for StaticSource {
    async fn fetch_batch(&self) -> Result<Vec<RawRecord>, UpstreamError> {
        Ok(self.0.clone())
    }
}

/// Upstream source that is always unreachable
pub struct FailingSource;

#[async_trait]
impl RecordSource for FailingSource {
    async fn fetch_batch(&self) -> Result<Vec<RawRecord>, UpstreamError> {
        Err(UpstreamError::NetworkError("connection refused".to_string()))
    }
}

pub fn raw(player: &str, hits: i64) -> RawRecord {
    RawRecord {
        rank: Some(99),
        player: Some(player.to_string()),
        age: Some(27),
        hits: Some(hits),
        year: Some(1930),
        bats: Some("L".to_string()),
    }
}

pub fn record(name: &str, rank: u32, result: &str) -> Record {
    Record {
        id: Uuid::new_v4(),
        rank,
        name: name.to_string(),
        age: Some(25),
        hits: 240,
        year: Some(1922),
        bats: "R".to_string(),
        result: result.to_string(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub generator: Arc<ScriptedGenerator>,
}

impl TestApp {
    pub async fn new(generator: ScriptedGenerator, source: Arc<dyn RecordSource>) -> Self {
        let db = init_database_pool("sqlite::memory:").await.unwrap();
        let generator = Arc::new(generator);
        let relay = RelayConfig {
            token_pace: Duration::ZERO,
            ..RelayConfig::default()
        };
        let state = AppState::new(db.clone(), source, generator.clone(), relay, Some(1));

        Self {
            router: build_router(state),
            db,
            generator,
        }
    }

    pub async fn with_records(generator: ScriptedGenerator, stored: &[Record]) -> Self {
        let app = Self::new(generator, Arc::new(StaticSource(Vec::new()))).await;
        records::replace_all(&app.db, stored).await.unwrap();
        app
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        (status, bytes.to_vec())
    }
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn generate_request(record: &Record) -> Request<Body> {
    json_request(
        "POST",
        "/api/records/generate",
        &serde_json::json!({
            "id": record.id,
            "name": record.name,
            "year": record.year,
            "hits": record.hits,
            "age": record.age,
            "bats": record.bats,
        }),
    )
}

pub fn parse_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("Should parse JSON")
}

/// Decode a complete SSE body into frames
pub fn parse_frames(bytes: &[u8]) -> Vec<StreamFrame> {
    FrameDecoder::new()
        .push(bytes)
        .expect("Should decode body")
        .iter()
        .map(|payload| StreamFrame::parse(payload).expect("Should parse frame"))
        .collect()
}
