//! Summary generation endpoint

use axum::{extract::State, response::sse::Sse, Json};
use dugout_common::GenerationRequest;
use tracing::debug;

use crate::error::ApiResult;
use crate::generation::FrameStream;
use crate::AppState;

/// POST /api/records/generate
///
/// Streams the record's summary as SSE frames. A record that already has a
/// result gets it back in a single completion frame without a backend call.
pub async fn generate_summary(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<Sse<FrameStream>> {
    debug!(record_id = %request.id, name = %request.name, "Generation requested");
    state.relay.open(request).await
}
