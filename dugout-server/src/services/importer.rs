//! Bulk import: fetch upstream batch, correct ranks, replace stored collection

use dugout_common::Record;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use super::upstream_client::RecordSource;
use crate::db::records;
use crate::error::{ApiError, ApiResult};
use crate::ranking::{correct_ranks, import_rng};

/// Replace the stored collection with a freshly ranked upstream batch
///
/// Upstream failures leave the stored collection untouched; the replace
/// itself is one transaction.
pub async fn import_records(
    pool: &SqlitePool,
    source: &dyn RecordSource,
    rank_seed: Option<u64>,
) -> ApiResult<Vec<Record>> {
    let raw = source.fetch_batch().await.map_err(|e| {
        warn!("Upstream fetch failed: {}", e);
        ApiError::UpstreamFetch(e.to_string())
    })?;

    let ranked = {
        let mut rng = import_rng(rank_seed);
        correct_ranks(raw, &mut rng)
    };

    let records: Vec<Record> = ranked
        .iter()
        .map(|r| Record::from_raw(Uuid::new_v4(), r.rank, &r.raw))
        .collect();

    records::replace_all(pool, &records).await?;

    info!(count = records.len(), "Imported records");
    Ok(records)
}
