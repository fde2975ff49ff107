//! dugout-client library
//!
//! HTTP client for dugout-server and the stream consumer that turns a
//! generation transmission into display state.

pub mod api_client;
pub mod consumer;
pub mod error;
pub mod state;
pub mod transport;

pub use api_client::{ApiClient, FetchSummary};
pub use consumer::{StreamConsumer, FALLBACK_MESSAGE};
pub use error::{ClientError, ClientResult};
pub use state::ViewState;
pub use transport::{ByteStream, Transport};
