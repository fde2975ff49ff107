//! Client stream consumer
//!
//! Opens a generation transmission for the selected record and applies its
//! frames to the shared `ViewState`:
//!
//! - a record that already has a result is shown immediately, no transport
//! - token frames append to `displayed` in arrival order; chunk boundaries
//!   from the transport are irrelevant (`FrameDecoder` buffers partial frames)
//! - the done frame's `result` is the server's stored text and replaces the
//!   reassembled buffer and the in-memory record
//! - a transport error or a body that ends without a done frame shows
//!   `FALLBACK_MESSAGE`
//!
//! At most one transmission is active. Every `open` bumps an epoch counter;
//! a reader only touches state while its epoch is current, checked inside
//! the same `watch` update that applies the frame, so an aborted reader can
//! never write into the view of a newer selection.

use dugout_common::{FrameDecoder, GenerationRequest, Record, StreamFrame};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::ViewState;
use crate::transport::Transport;

/// Shown instead of the live buffer when a transmission does not complete
pub const FALLBACK_MESSAGE: &str = "Failed to load description.";

struct Transmission {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

pub struct StreamConsumer {
    transport: Arc<dyn Transport>,
    state: Arc<watch::Sender<ViewState>>,
    epoch: Arc<AtomicU64>,
    active: Mutex<Option<Transmission>>,
}

impl StreamConsumer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            transport,
            state: Arc::new(state),
            epoch: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn set_records(&self, records: Vec<Record>) {
        self.state.send_modify(|state| state.records = records);
    }

    /// Select `record` and show its description
    ///
    /// Cancels any previous transmission. Must be called inside a tokio
    /// runtime when the record still needs generation.
    pub fn open(&self, record: &Record) {
        self.abort_active();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        if record.has_result() {
            debug!(record_id = %record.id, "Showing stored description");
            self.state.send_modify(|state| {
                state.selected = Some(record.id);
                state.displayed = record.result.clone();
                state.generating = false;
                state.failed = false;
            });
            return;
        }

        self.state.send_modify(|state| {
            state.selected = Some(record.id);
            state.displayed.clear();
            state.generating = true;
            state.failed = false;
        });

        let cancel = CancellationToken::new();
        let reader = Reader {
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
            epoch_counter: Arc::clone(&self.epoch),
            epoch,
            record: record.clone(),
        };
        let handle = tokio::spawn(reader.run(cancel.clone()));

        *self.lock_active() = Some(Transmission {
            cancel,
            handle: Some(handle),
        });
    }

    /// Abort the active transmission; later frames from it are discarded
    pub fn cancel(&self) {
        self.abort_active();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|state| {
            let was_generating = state.generating;
            state.generating = false;
            was_generating
        });
    }

    /// Cancel and clear the selection
    pub fn close(&self) {
        self.cancel();
        self.state.send_modify(|state| {
            state.selected = None;
            state.displayed.clear();
            state.failed = false;
        });
    }

    /// Wait for the active transmission's reader to finish
    pub async fn join(&self) {
        let handle = self.lock_active().as_mut().and_then(|t| t.handle.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                debug!("Reader task ended abnormally: {}", e);
            }
        }
    }

    fn abort_active(&self) {
        if let Some(transmission) = self.lock_active().take() {
            transmission.cancel.cancel();
            if let Some(handle) = transmission.handle {
                handle.abort();
            }
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<Transmission>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StreamConsumer {
    fn drop(&mut self) {
        self.abort_active();
    }
}

/// Reads one transmission
struct Reader {
    transport: Arc<dyn Transport>,
    state: Arc<watch::Sender<ViewState>>,
    epoch_counter: Arc<AtomicU64>,
    epoch: u64,
    record: Record,
}

impl Reader {
    async fn run(self, cancel: CancellationToken) {
        let request = GenerationRequest::from(&self.record);
        let record_id = self.record.id;

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            opened = self.transport.open(&request) => opened,
        };

        let mut body = match opened {
            Ok(body) => body,
            Err(e) => {
                warn!(record_id = %record_id, "Failed to open generation stream: {}", e);
                self.fail();
                return;
            }
        };

        let mut decoder = FrameDecoder::new();
        let mut buffer = String::new();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(record_id = %record_id, "Transmission canceled");
                    return;
                }
                chunk = body.next() => chunk,
            };

            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    warn!(record_id = %record_id, "Generation stream lost: {}", e);
                    self.fail();
                    return;
                }
                None => {
                    warn!(
                        record_id = %record_id,
                        pending_bytes = decoder.pending(),
                        "Generation stream ended without completion"
                    );
                    self.fail();
                    return;
                }
            };

            let payloads = match decoder.push(&bytes) {
                Ok(payloads) => payloads,
                Err(e) => {
                    warn!(record_id = %record_id, "Generation stream unreadable: {}", e);
                    self.fail();
                    return;
                }
            };

            for payload in payloads {
                match StreamFrame::parse(&payload) {
                    Ok(StreamFrame::Token { content }) => {
                        buffer.push_str(&content);
                        if !self.apply(|state| state.displayed.push_str(&content)) {
                            return;
                        }
                    }
                    Ok(StreamFrame::Done { done: true, result }) => {
                        let text = result.unwrap_or(buffer);
                        info!(record_id = %record_id, chars = text.chars().count(), "Description complete");
                        self.finish(text);
                        return;
                    }
                    Ok(StreamFrame::Done { done: false, .. }) => {
                        debug!(record_id = %record_id, "Ignoring frame with done=false");
                    }
                    Err(e) => {
                        warn!(record_id = %record_id, "Undecodable frame: {}", e);
                        self.fail();
                        return;
                    }
                }
            }
        }
    }

    /// Apply `update` if this reader is still current; false once superseded
    fn apply(&self, update: impl FnOnce(&mut ViewState)) -> bool {
        let mut current = true;
        self.state.send_if_modified(|state| {
            if self.epoch_counter.load(Ordering::SeqCst) != self.epoch {
                current = false;
                return false;
            }
            update(state);
            true
        });
        current
    }

    fn finish(&self, text: String) {
        let mut completed = self.record.clone();
        completed.result = text;

        self.apply(|state| {
            state.displayed = completed.result.clone();
            state.generating = false;
            state.failed = false;
            state.replace_record(completed);
        });
    }

    fn fail(&self) {
        self.apply(|state| {
            state.displayed = FALLBACK_MESSAGE.to_string();
            state.generating = false;
            state.failed = true;
        });
    }
}
