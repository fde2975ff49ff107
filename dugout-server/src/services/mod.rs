//! External collaborators and the bulk import built on them

pub mod chat_client;
pub mod importer;
pub mod upstream_client;

pub use chat_client::ChatCompletionClient;
pub use importer::import_records;
pub use upstream_client::{HttpRecordSource, RecordSource, UpstreamError};
