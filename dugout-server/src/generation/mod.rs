//! Summary generation pipeline
//!
//! `session` turns one backend call into an ordered event sequence,
//! `relay` forwards those events to the requesting client as SSE frames, and
//! `gate` makes sure a finished result is persisted at most once per record.

pub mod gate;
pub mod prompt;
pub mod relay;
pub mod session;

pub use gate::PersistenceGate;
pub use prompt::build_prompt;
pub use relay::{FrameStream, StreamRelay};
pub use session::GenerationSession;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Text deltas from the backend in arrival order
///
/// The stream ending normally means the backend signaled completion. An
/// `Err` item means the call failed; nothing useful follows it.
pub type TokenStream = BoxStream<'static, Result<String, GenerationError>>;

/// Generation backend errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Generation backend not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Backend stream ended before completion")]
    Interrupted,
}

/// Text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Submit `prompt` and return its streamed response
    async fn stream_completion(&self, prompt: &str) -> Result<TokenStream, GenerationError>;
}
