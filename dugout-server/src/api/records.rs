//! Record collection endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use dugout_common::{Record, RecordUpdate};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::records;
use crate::error::{ApiError, ApiResult};
use crate::services::import_records;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub message: String,
    pub count: usize,
}

/// GET /api/records
pub async fn list_records(State(state): State<AppState>) -> ApiResult<Json<Vec<Record>>> {
    let records = records::find_all(&state.db).await?;
    debug!(count = records.len(), "Listing records");
    Ok(Json(records))
}

/// POST /api/records/fetch
///
/// Replaces the stored collection with a freshly ranked upstream batch.
pub async fn fetch_records(State(state): State<AppState>) -> ApiResult<Json<FetchResponse>> {
    let imported = import_records(&state.db, state.source.as_ref(), state.rank_seed).await?;

    Ok(Json(FetchResponse {
        message: "Records fetched and stored".to_string(),
        count: imported.len(),
    }))
}

/// PUT /api/records/:id
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<RecordUpdate>,
) -> ApiResult<Json<Record>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid record id: {}", id)))?;

    let record = records::update(&state.db, id, &changes).await?;
    info!(record_id = %id, "Record updated");
    Ok(Json(record))
}
