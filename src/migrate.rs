use sqlx::SqlitePool;

use crate::error::Result;

/// Create the chunk table and its indexes. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL,
            source TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_mtime INTEGER NOT NULL,
            file_size INTEGER NOT NULL,
            fingerprint TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            chunk_size INTEGER NOT NULL,
            embedding_model TEXT NOT NULL,
            ingested_at TEXT NOT NULL,
            scope TEXT NOT NULL,
            schema_version INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_scope ON chunks(scope)")
        .execute(pool)
        .await?;

    Ok(())
}
