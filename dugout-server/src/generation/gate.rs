//! Persistence gate
//!
//! Decides whether a record needs generation at all and writes finished
//! results. Concurrent generations for the same never-generated record are
//! not prevented (both may pass `existing_result`), but only the first
//! commit lands: the write is conditional on the stored result still being
//! empty, and every caller gets the stored text back as the canonical value.

use dugout_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::records;

#[derive(Clone)]
pub struct PersistenceGate {
    pool: SqlitePool,
}

impl PersistenceGate {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stored result for `id`, if one exists
    ///
    /// `Ok(None)` means the record exists and still needs generation.
    /// Unknown ids are `Error::NotFound`.
    pub async fn existing_result(&self, id: Uuid) -> Result<Option<String>> {
        match records::find_result(&self.pool, id).await? {
            None => Err(Error::NotFound(format!("record {}", id))),
            Some(text) if text.is_empty() => Ok(None),
            Some(text) => Ok(Some(text)),
        }
    }

    /// Persist a finished result and return the canonical stored text
    pub async fn commit(&self, id: Uuid, text: &str) -> Result<String> {
        if records::store_result_if_empty(&self.pool, id, text).await? {
            info!(record_id = %id, chars = text.chars().count(), "Stored generated result");
            return Ok(text.to_string());
        }

        match records::find_result(&self.pool, id).await? {
            Some(existing) => {
                warn!(
                    record_id = %id,
                    "Result already stored by a concurrent generation; keeping the stored text"
                );
                Ok(existing)
            }
            None => Err(Error::NotFound(format!("record {}", id))),
        }
    }
}
