//! Record table operations

use dugout_common::{Error, Record, RecordUpdate, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "SELECT id, rank, name, age, hits, year, bats, result FROM records";

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid record id {:?}: {}", id, e)))?;

    Ok(Record {
        id,
        rank: row.get::<i64, _>("rank") as u32,
        name: row.get("name"),
        age: row.get::<Option<i64>, _>("age").map(|a| a as u32),
        hits: row.get::<i64, _>("hits") as u32,
        year: row.get::<Option<i64>, _>("year").map(|y| y as i32),
        bats: row.get("bats"),
        result: row.get("result"),
    })
}

async fn fetch_one_record<'e, E: SqliteExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Record>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// All records in insertion order
pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Record>> {
    let rows = sqlx::query(&format!("{} ORDER BY rowid", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Record>> {
    fetch_one_record(pool, id).await
}

/// Replace the whole collection (delete-then-insert as one transaction)
///
/// If any statement fails the transaction rolls back on drop and the
/// previous collection is left untouched.
pub async fn replace_all(pool: &SqlitePool, records: &[Record]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM records").execute(&mut *tx).await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO records (id, rank, name, age, hits, year, bats, result)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.rank as i64)
        .bind(&record.name)
        .bind(record.age.map(|a| a as i64))
        .bind(record.hits as i64)
        .bind(record.year.map(|y| y as i64))
        .bind(&record.bats)
        .bind(&record.result)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(count = records.len(), "Replaced record collection");
    Ok(())
}

/// Overwrite the provided fields of one record and return the result
pub async fn update(pool: &SqlitePool, id: Uuid, changes: &RecordUpdate) -> Result<Record> {
    let mut tx = pool.begin().await?;

    let mut record = fetch_one_record(&mut *tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("record {}", id)))?;

    changes.apply_to(&mut record);

    sqlx::query(
        r#"
        UPDATE records
        SET name = ?, age = ?, hits = ?, year = ?, bats = ?, result = ?
        WHERE id = ?
        "#,
    )
    .bind(&record.name)
    .bind(record.age.map(|a| a as i64))
    .bind(record.hits as i64)
    .bind(record.year.map(|y| y as i64))
    .bind(&record.bats)
    .bind(&record.result)
    .bind(id.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!(record_id = %id, "Updated record");
    Ok(record)
}

/// Stored result text; `None` when the record does not exist
pub async fn find_result(pool: &SqlitePool, id: Uuid) -> Result<Option<String>> {
    let result: Option<String> = sqlx::query_scalar("SELECT result FROM records WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(result)
}

/// Write `text` as the result only while the stored result is still empty
///
/// Single statement, so the store's own atomicity decides between
/// concurrent writers. Returns `true` when this call wrote.
pub async fn store_result_if_empty(pool: &SqlitePool, id: Uuid, text: &str) -> Result<bool> {
    let outcome = sqlx::query("UPDATE records SET result = ? WHERE id = ? AND result = ''")
        .bind(text)
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(outcome.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database_pool;

    fn record(name: &str, rank: u32, hits: u32) -> Record {
        Record {
            id: Uuid::new_v4(),
            rank,
            name: name.to_string(),
            age: Some(25),
            hits,
            year: Some(1920),
            bats: "L".to_string(),
            result: String::new(),
        }
    }

    async fn test_pool() -> SqlitePool {
        init_database_pool("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn replace_all_keeps_insertion_order() {
        let pool = test_pool().await;
        let batch = vec![record("Second", 2, 250), record("First", 1, 260)];

        replace_all(&pool, &batch).await.unwrap();

        let stored = find_all(&pool).await.unwrap();
        assert_eq!(stored, batch);
    }

    #[tokio::test]
    async fn replace_all_discards_previous_collection() {
        let pool = test_pool().await;
        replace_all(&pool, &[record("Old", 1, 10)]).await.unwrap();

        let fresh = vec![record("New", 1, 20)];
        replace_all(&pool, &fresh).await.unwrap();

        assert_eq!(find_all(&pool).await.unwrap(), fresh);
    }

    #[tokio::test]
    async fn failed_replace_leaves_collection_untouched() {
        let pool = test_pool().await;
        let original = vec![record("Kept", 1, 10)];
        replace_all(&pool, &original).await.unwrap();

        // Duplicate primary key makes the second insert fail mid-transaction
        let dup = record("Dup", 1, 5);
        let result = replace_all(&pool, &[dup.clone(), dup]).await;

        assert!(result.is_err());
        assert_eq!(find_all(&pool).await.unwrap(), original);
    }

    #[tokio::test]
    async fn update_unknown_record_is_not_found() {
        let pool = test_pool().await;
        let err = update(&pool, Uuid::new_v4(), &RecordUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn update_persists_changes() {
        let pool = test_pool().await;
        let original = record("Rogers Hornsby", 3, 250);
        replace_all(&pool, &[original.clone()]).await.unwrap();

        let changes = RecordUpdate {
            name: Some("Rogers Hornsby Jr.".to_string()),
            ..Default::default()
        };
        let updated = update(&pool, original.id, &changes).await.unwrap();

        assert_eq!(updated.name, "Rogers Hornsby Jr.");
        assert_eq!(updated.rank, 3);
        assert_eq!(find_by_id(&pool, original.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn conditional_result_write_is_first_writer_wins() {
        let pool = test_pool().await;
        let target = record("Bill Terry", 1, 254);
        replace_all(&pool, &[target.clone()]).await.unwrap();

        assert_eq!(find_result(&pool, target.id).await.unwrap(), Some(String::new()));
        assert!(store_result_if_empty(&pool, target.id, "first").await.unwrap());
        assert!(!store_result_if_empty(&pool, target.id, "second").await.unwrap());
        assert_eq!(find_result(&pool, target.id).await.unwrap().as_deref(), Some("first"));

        assert_eq!(find_result(&pool, Uuid::new_v4()).await.unwrap(), None);
    }
}
