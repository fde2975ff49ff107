//! Generation session
//!
//! One backend request per session. The producer task pushes events into a
//! bounded channel, so a slow consumer throttles how fast backend deltas are
//! pulled. Every suspension point also watches the cancellation token; once
//! canceled the task stops without emitting a terminal event and drops the
//! backend stream, which abandons the HTTP call.

use dugout_common::{GenerationEvent, GenerationRequest};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{build_prompt, TextGenerator};

/// Starts generation sessions against one backend
#[derive(Clone)]
pub struct GenerationSession {
    generator: Arc<dyn TextGenerator>,
    channel_capacity: usize,
}

impl GenerationSession {
    pub fn new(generator: Arc<dyn TextGenerator>, channel_capacity: usize) -> Self {
        Self {
            generator,
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Start a session for `request`
    ///
    /// The receiver yields `Token`s in backend order followed by exactly one
    /// `Done` or `Error`, unless `cancel` fires first, in which case the
    /// channel simply closes.
    pub fn start(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<GenerationEvent> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let generator = Arc::clone(&self.generator);
        let prompt = build_prompt(request);
        let record_id = request.id;

        tokio::spawn(async move {
            run_session(generator, prompt, record_id, tx, cancel).await;
        });

        rx
    }
}

async fn run_session(
    generator: Arc<dyn TextGenerator>,
    prompt: String,
    record_id: Uuid,
    tx: mpsc::Sender<GenerationEvent>,
    cancel: CancellationToken,
) {
    info!(record_id = %record_id, "Generation session started");

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(record_id = %record_id, "Session canceled before backend responded");
            return;
        }
        opened = generator.stream_completion(&prompt) => opened,
    };

    let mut tokens = match opened {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!(record_id = %record_id, "Generation backend failed: {}", e);
            send(&tx, &cancel, GenerationEvent::Error(e.to_string())).await;
            return;
        }
    };

    let mut token_count = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(record_id = %record_id, token_count, "Session canceled mid-stream");
                return;
            }
            next = tokens.next() => next,
        };

        let event = match next {
            Some(Ok(text)) if text.is_empty() => continue,
            Some(Ok(text)) => {
                token_count += 1;
                GenerationEvent::Token(text)
            }
            Some(Err(e)) => {
                warn!(record_id = %record_id, token_count, "Generation stream failed: {}", e);
                GenerationEvent::Error(e.to_string())
            }
            None => {
                info!(record_id = %record_id, token_count, "Generation session completed");
                GenerationEvent::Done
            }
        };

        let terminal = event.is_terminal();
        if !send(&tx, &cancel, event).await || terminal {
            return;
        }
    }
}

/// Send unless canceled or the receiver is gone; false means stop producing
async fn send(
    tx: &mpsc::Sender<GenerationEvent>,
    cancel: &CancellationToken,
    event: GenerationEvent,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(event) => sent.is_ok(),
    }
}
