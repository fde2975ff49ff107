//! Stream relay
//!
//! Bridges one generation session to the single client that requested it as
//! an SSE response:
//!
//! - record already has a result: one `{"done":true,"result":…}` frame, no session
//! - otherwise: one `{"content":…}` frame per fragment, then after the gate
//!   commit one `{"done":true,"result":…}` frame carrying the stored text
//! - backend error or failed commit: the stream ends with no done frame and
//!   nothing is persisted
//!
//! When the client disconnects axum drops the response stream; the drop
//! guard held inside it cancels the session.

use axum::response::sse::{Event, KeepAlive, Sse};
use dugout_common::{GenerationEvent, GenerationRequest, StreamFrame};
use futures::stream::BoxStream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{GenerationSession, PersistenceGate, TextGenerator};
use crate::config::RelayConfig;
use crate::error::ApiResult;

/// SSE frames of one transmission
pub type FrameStream = BoxStream<'static, Result<Event, Infallible>>;

pub struct StreamRelay {
    session: GenerationSession,
    gate: PersistenceGate,
    config: RelayConfig,
}

impl StreamRelay {
    pub fn new(generator: Arc<dyn TextGenerator>, gate: PersistenceGate, config: RelayConfig) -> Self {
        Self {
            session: GenerationSession::new(generator, config.session_channel_capacity),
            gate,
            config,
        }
    }

    /// Open a transmission for `request`
    ///
    /// Unknown records and store failures are returned as errors before any
    /// frame is written.
    pub async fn open(&self, request: GenerationRequest) -> ApiResult<Sse<FrameStream>> {
        let stream = match self.gate.existing_result(request.id).await? {
            Some(stored) => {
                info!(record_id = %request.id, "Serving stored result");
                stored_result_stream(stored)
            }
            None => self.live_stream(request),
        };

        Ok(Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(self.config.keepalive)
                .text("heartbeat"),
        ))
    }

    fn live_stream(&self, request: GenerationRequest) -> FrameStream {
        let cancel = CancellationToken::new();
        let mut events = self.session.start(&request, cancel.clone());
        let gate = self.gate.clone();
        let pace = self.config.token_pace;
        let split_tokens = self.config.split_tokens;
        let record_id = request.id;
        // Owned by the stream from creation, not from first poll
        let cancel_on_drop = cancel.drop_guard();

        Box::pin(async_stream::stream! {
            let _cancel_on_drop = cancel_on_drop;
            let mut full_text = String::new();

            while let Some(event) = events.recv().await {
                match event {
                    GenerationEvent::Token(text) => {
                        full_text.push_str(&text);
                        for fragment in fragments(&text, split_tokens) {
                            if !pace.is_zero() {
                                tokio::time::sleep(pace).await;
                            }
                            if let Some(frame) = frame_event(&StreamFrame::token(fragment)) {
                                yield Ok::<Event, Infallible>(frame);
                            }
                        }
                    }
                    GenerationEvent::Done => {
                        // Own task so a disconnect right now cannot abort the write halfway
                        let commit_gate = gate.clone();
                        let text = std::mem::take(&mut full_text);
                        let committed =
                            tokio::spawn(async move { commit_gate.commit(record_id, &text).await }).await;

                        match committed {
                            Ok(Ok(canonical)) => {
                                if let Some(frame) = frame_event(&StreamFrame::done(Some(canonical))) {
                                    yield Ok::<Event, Infallible>(frame);
                                }
                                info!(record_id = %record_id, "Transmission completed");
                            }
                            Ok(Err(e)) => {
                                warn!(record_id = %record_id, "Failed to persist result: {}", e);
                            }
                            Err(e) => {
                                warn!(record_id = %record_id, "Persist task failed: {}", e);
                            }
                        }
                        break;
                    }
                    GenerationEvent::Error(reason) => {
                        warn!(
                            record_id = %record_id,
                            discarded_chars = full_text.chars().count(),
                            "Generation failed, closing transmission: {}",
                            reason
                        );
                        break;
                    }
                }
            }

            debug!(record_id = %record_id, "Relay stream finished");
        })
    }
}

/// Single completion frame for a record that already has a result
fn stored_result_stream(stored: String) -> FrameStream {
    let frame = frame_event(&StreamFrame::done(Some(stored)));
    Box::pin(futures::stream::iter(frame.map(Ok::<Event, Infallible>)))
}

/// Split a token into per-character fragments when enabled
fn fragments(text: &str, split: bool) -> Vec<String> {
    if split {
        text.chars().map(String::from).collect()
    } else {
        vec![text.to_string()]
    }
}

fn frame_event(frame: &StreamFrame) -> Option<Event> {
    match frame.to_json() {
        Ok(json) => Some(Event::default().data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize frame: {}", e);
            None
        }
    }
}
