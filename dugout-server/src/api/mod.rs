//! HTTP API for dugout-server

pub mod generate;
pub mod health;
pub mod records;

pub use generate::generate_summary;
pub use health::{health_check, HealthResponse};
pub use records::{fetch_records, list_records, update_record, FetchResponse};
