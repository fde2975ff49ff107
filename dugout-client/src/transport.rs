//! Generation transport seam
//!
//! The consumer only needs a way to open a transmission and read its raw
//! bytes. Chunk boundaries carry no meaning.

use async_trait::async_trait;
use dugout_common::GenerationRequest;
use futures::stream::BoxStream;

use crate::error::ClientError;

/// Raw body chunks of one transmission
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ClientError>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the generation transmission for `request`
    async fn open(&self, request: &GenerationRequest) -> Result<ByteStream, ClientError>;
}
