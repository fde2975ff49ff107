//! # Dugout Common Library
//!
//! Shared code for the dugout server and client including:
//! - Record and generation request models
//! - Generation event types
//! - Streaming wire framing (encode and incremental decode)
//! - Configuration loading and credential resolution
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod sse;

pub use error::{Error, Result};
pub use events::GenerationEvent;
pub use models::{GenerationRequest, RawRecord, Record, RecordUpdate};
pub use sse::{FrameDecoder, StreamFrame};
