//! dugout-server library
//!
//! Record service: bulk import from the upstream source with rank
//! correction, editing, and streamed summary generation over SSE.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod ranking;
pub mod services;

pub use error::{ApiError, ApiResult};

use generation::{PersistenceGate, StreamRelay, TextGenerator};
use services::RecordSource;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store
    pub db: SqlitePool,
    /// Upstream data source for bulk import
    pub source: Arc<dyn RecordSource>,
    /// Generation relay
    pub relay: Arc<StreamRelay>,
    /// Fixed tie-break seed (random per import when `None`)
    pub rank_seed: Option<u64>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        source: Arc<dyn RecordSource>,
        generator: Arc<dyn TextGenerator>,
        relay_config: config::RelayConfig,
        rank_seed: Option<u64>,
    ) -> Self {
        let gate = PersistenceGate::new(db.clone());
        Self {
            db,
            source,
            relay: Arc::new(StreamRelay::new(generator, gate, relay_config)),
            rank_seed,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    Router::new()
        .route("/health", get(api::health_check))
        .route("/api/records", get(api::list_records))
        .route("/api/records/fetch", post(api::fetch_records))
        .route("/api/records/generate", post(api::generate_summary))
        .route("/api/records/:id", put(api::update_record))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
