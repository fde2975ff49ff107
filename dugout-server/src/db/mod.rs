//! Record store access
//!
//! SQLite through sqlx. The store is the single source of truth for
//! generated results.

pub mod records;

use dugout_common::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Initialize database connection pool and create tables
///
/// In-memory URLs get a single connection that is never recycled: every
/// SQLite connection to `:memory:` is its own database.
pub async fn init_database_pool(database_url: &str) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", database_url);

    let options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };
    let pool = options.connect(database_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            rank INTEGER NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            age INTEGER,
            hits INTEGER NOT NULL DEFAULT 0,
            year INTEGER,
            bats TEXT NOT NULL DEFAULT '',
            result TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (records)");

    Ok(())
}
