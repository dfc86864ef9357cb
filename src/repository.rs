//! Vector store repository.
//!
//! Sole owner of all reads and writes against the persisted chunk
//! collection. Every method performs a single atomic database operation; no
//! transaction spans method calls. Malformed input is rejected before any
//! I/O, and underlying store errors propagate uncaught so the orchestrator
//! sees exactly which batch failed.

use std::collections::HashMap;

use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::embedding::{blob_to_vec, distance_to_similarity, squared_l2, vec_to_blob};
use crate::error::{EngineError, Result};
use crate::models::{ChunkMetadata, CollectionStats, FileState, ScoredChunk, GLOBAL_SCOPE};

/// Metadata predicate for [`VectorRepository::query_similar`].
///
/// `scope` restricts results to chunks tagged [`GLOBAL_SCOPE`] or the given
/// scope; `source` restricts to one source path. `None` fields impose no
/// restriction.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub scope: Option<String>,
    pub source: Option<String>,
}

impl QueryFilter {
    pub fn for_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            source: None,
        }
    }

    fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if let Some(ref scope) = self.scope {
            if metadata.scope != GLOBAL_SCOPE && metadata.scope != *scope {
                return false;
            }
        }
        if let Some(ref source) = self.source {
            if metadata.source != *source {
                return false;
            }
        }
        true
    }
}

pub struct VectorRepository {
    pool: SqlitePool,
    collection: String,
}

impl VectorRepository {
    pub fn new(pool: SqlitePool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write or overwrite a batch of records keyed by id.
    ///
    /// An existing record sharing an id is replaced entirely — id, text,
    /// vector, and metadata are all overwritten, never merged. All four
    /// slices must have equal, non-zero length and every id must be
    /// non-empty; violations are rejected before any write.
    pub async fn upsert_batch(
        &self,
        ids: &[String],
        texts: &[String],
        vectors: &[Vec<f32>],
        metadatas: &[ChunkMetadata],
    ) -> Result<()> {
        if ids.is_empty() {
            return Err(EngineError::validation("upsert_batch requires a non-empty batch"));
        }
        if ids.len() != texts.len() || ids.len() != vectors.len() || ids.len() != metadatas.len() {
            return Err(EngineError::validation(format!(
                "upsert_batch length mismatch: {} ids, {} texts, {} vectors, {} metadatas",
                ids.len(),
                texts.len(),
                vectors.len(),
                metadatas.len()
            )));
        }
        if ids.iter().any(|id| id.is_empty()) {
            return Err(EngineError::validation("upsert_batch ids must be non-empty"));
        }

        let mut tx = self.pool.begin().await?;
        for (((id, text), vector), meta) in ids
            .iter()
            .zip(texts.iter())
            .zip(vectors.iter())
            .zip(metadatas.iter())
        {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO chunks (
                    id, content, embedding,
                    source, file_name, file_type, file_mtime, file_size, fingerprint,
                    chunk_index, content_hash, chunk_size,
                    embedding_model, ingested_at, scope, schema_version
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(text)
            .bind(vec_to_blob(vector))
            .bind(&meta.source)
            .bind(&meta.file_name)
            .bind(&meta.file_type)
            .bind(meta.file_mtime)
            .bind(meta.file_size)
            .bind(&meta.fingerprint)
            .bind(meta.chunk_index)
            .bind(&meta.content_hash)
            .bind(meta.chunk_size)
            .bind(&meta.embedding_model)
            .bind(&meta.ingested_at)
            .bind(&meta.scope)
            .bind(meta.schema_version)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(count = ids.len(), "upserted chunk batch");
        Ok(())
    }

    /// Delete every chunk whose source path equals `source`. Returns the
    /// number of chunks deleted; 0 when none existed.
    pub async fn delete_by_source(&self, source: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE source = ?")
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete specific chunk ids. Empty input is a no-op returning 0.
    pub async fn delete_by_ids(&self, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut deleted = 0u64;
        for id in ids {
            let result = sqlx::query("DELETE FROM chunks WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            deleted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(deleted)
    }

    /// Nearest-neighbor search over records satisfying `filter`.
    ///
    /// Returns up to `top_k` results ordered by ascending distance (squared
    /// Euclidean, computed brute-force over the candidate rows), each
    /// carrying its similarity score `exp(-distance)`. An empty result set
    /// is not an error.
    pub async fn query_similar(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        if vector.is_empty() {
            return Err(EngineError::validation("query vector must not be empty"));
        }
        if top_k == 0 {
            return Err(EngineError::validation("top_k must be > 0"));
        }

        let rows = sqlx::query("SELECT * FROM chunks").fetch_all(&self.pool).await?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .filter_map(|row| {
                let metadata = row_metadata(row);
                if let Some(f) = filter {
                    if !f.matches(&metadata) {
                        return None;
                    }
                }
                let blob: Vec<u8> = row.get("embedding");
                let stored = blob_to_vec(&blob);
                let distance = squared_l2(vector, &stored);
                Some(ScoredChunk {
                    content: row.get("content"),
                    metadata,
                    distance,
                    similarity: distance_to_similarity(distance),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        debug!(results = scored.len(), top_k, "similarity query complete");
        Ok(scored)
    }

    /// Reconstruct the per-source file state from stored chunk metadata,
    /// deduplicated by source path.
    ///
    /// This is a full metadata scan — O(index size). The diff engine calls
    /// it once per sync run, never per file.
    pub async fn get_indexed_file_state(&self) -> Result<HashMap<String, FileState>> {
        let rows = sqlx::query(
            "SELECT source, file_mtime, file_size FROM chunks GROUP BY source",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get::<String, _>("source"),
                    FileState {
                        mtime: row.get("file_mtime"),
                        size: row.get("file_size"),
                    },
                )
            })
            .collect())
    }

    /// Total chunk count and distinct source-file count, for health
    /// reporting.
    pub async fn get_collection_stats(&self) -> Result<CollectionStats> {
        let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let unique_sources: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT source) FROM chunks")
            .fetch_one(&self.pool)
            .await?;

        Ok(CollectionStats {
            total_chunks,
            unique_sources,
            collection: self.collection.clone(),
        })
    }
}

fn row_metadata(row: &sqlx::sqlite::SqliteRow) -> ChunkMetadata {
    ChunkMetadata {
        source: row.get("source"),
        file_name: row.get("file_name"),
        file_type: row.get("file_type"),
        file_mtime: row.get("file_mtime"),
        file_size: row.get("file_size"),
        fingerprint: row.get("fingerprint"),
        chunk_index: row.get("chunk_index"),
        content_hash: row.get("content_hash"),
        chunk_size: row.get("chunk_size"),
        embedding_model: row.get("embedding_model"),
        ingested_at: row.get("ingested_at"),
        scope: row.get("scope"),
        schema_version: row.get("schema_version"),
    }
}
