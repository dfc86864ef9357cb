//! Retrieval query service.
//!
//! Embeds a free-text query and runs a scope-filtered similarity search,
//! returning ranked, source-attributed passages. The service does not retry
//! provider failures — retries with different parameters belong to the
//! orchestration layer above it.

use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{EngineError, Result};
use crate::models::ScoredChunk;
use crate::repository::{QueryFilter, VectorRepository};

pub struct RetrievalService {
    provider: Box<dyn EmbeddingProvider>,
    repo: VectorRepository,
    config: RetrievalConfig,
}

impl RetrievalService {
    pub fn new(
        provider: Box<dyn EmbeddingProvider>,
        repo: VectorRepository,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            provider,
            repo,
            config,
        }
    }

    /// Retrieve the passages most similar to `query`, visible to `scope`.
    ///
    /// Results carry chunks tagged with the reserved global scope or with
    /// `scope` itself, ordered by descending similarity. `top_k` overrides
    /// the configured default when given. An empty query is rejected before
    /// any embedding call.
    pub async fn search(
        &self,
        query: &str,
        scope: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<ScoredChunk>> {
        if query.trim().is_empty() {
            return Err(EngineError::validation("query must not be empty"));
        }

        let k = top_k.unwrap_or(self.config.top_k);
        debug!(top_k = k, scope, "embedding query");

        let vectors = self.provider.embed_batch(&[query.to_string()]).await?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::provider("empty embedding response"))?;

        let filter = QueryFilter::for_scope(scope);
        let mut results = self
            .repo
            .query_similar(&query_vector, k, Some(&filter))
            .await?;

        if let Some(floor) = self.config.min_similarity {
            results.retain(|r| r.similarity >= floor);
        }

        info!(results = results.len(), "retrieval complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::embedding::HashedProvider;
    use crate::models::{ChunkMetadata, GLOBAL_SCOPE, METADATA_SCHEMA_VERSION};
    use tempfile::TempDir;

    async fn service_with_docs(
        min_similarity: Option<f64>,
        docs: &[(&str, &str, &str)],
    ) -> (TempDir, RetrievalService) {
        let tmp = TempDir::new().unwrap();
        let store = StoreConfig {
            path: tmp.path().join("q.sqlite"),
            collection: "documents".to_string(),
            upsert_batch_size: 256,
        };
        let pool = crate::db::connect(&store).await.unwrap();
        crate::migrate::run_migrations(&pool).await.unwrap();
        let repo = VectorRepository::new(pool, store.collection.clone());

        let provider = HashedProvider::new(32, 10);
        for (i, (source, text, scope)) in docs.iter().enumerate() {
            let vector = provider
                .embed_batch(&[text.to_string()])
                .await
                .unwrap()
                .remove(0);
            let meta = ChunkMetadata {
                source: source.to_string(),
                file_name: source.to_string(),
                file_type: "txt".to_string(),
                file_mtime: 1,
                file_size: 1,
                fingerprint: String::new(),
                chunk_index: 0,
                content_hash: format!("h{}", i),
                chunk_size: text.len() as i64,
                embedding_model: "hashed-sha256".to_string(),
                ingested_at: "2026-01-01T00:00:00Z".to_string(),
                scope: scope.to_string(),
                schema_version: METADATA_SCHEMA_VERSION,
            };
            repo.upsert_batch(
                &[format!("id-{}", i)],
                &[text.to_string()],
                &[vector],
                &[meta],
            )
            .await
            .unwrap();
        }

        let config = RetrievalConfig {
            top_k: 5,
            min_similarity,
        };
        (
            tmp,
            RetrievalService::new(Box::new(HashedProvider::new(32, 10)), repo, config),
        )
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_embedding() {
        let (_tmp, service) = service_with_docs(None, &[]).await;
        let err = service.search("   ", GLOBAL_SCOPE, None).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_exact_match_ranks_first_with_similarity_one() {
        let (_tmp, service) = service_with_docs(
            None,
            &[
                ("a.txt", "the exact passage", GLOBAL_SCOPE),
                ("b.txt", "something else entirely", GLOBAL_SCOPE),
            ],
        )
        .await;

        let results = service
            .search("the exact passage", GLOBAL_SCOPE, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.source, "a.txt");
        assert!((results[0].similarity - 1.0).abs() < 1e-9);
        assert!(results[0].similarity > results[1].similarity);
    }

    #[tokio::test]
    async fn test_scope_isolation() {
        let (_tmp, service) = service_with_docs(
            None,
            &[
                ("global.txt", "shared knowledge", GLOBAL_SCOPE),
                ("mine.txt", "private to session a", "session-a"),
                ("theirs.txt", "private to session b", "session-b"),
            ],
        )
        .await;

        let results = service
            .search("knowledge", "session-a", None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.metadata.scope == GLOBAL_SCOPE || r.metadata.scope == "session-a"));
    }

    #[tokio::test]
    async fn test_top_k_override() {
        let docs: Vec<(String, String)> = (0..8)
            .map(|i| (format!("f{}.txt", i), format!("passage number {}", i)))
            .collect();
        let borrowed: Vec<(&str, &str, &str)> = docs
            .iter()
            .map(|(s, t)| (s.as_str(), t.as_str(), GLOBAL_SCOPE))
            .collect();
        let (_tmp, service) = service_with_docs(None, &borrowed).await;

        let results = service
            .search("passage", GLOBAL_SCOPE, Some(3))
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_min_similarity_floor() {
        let (_tmp, service) = service_with_docs(
            Some(0.9),
            &[
                ("a.txt", "needle", GLOBAL_SCOPE),
                ("b.txt", "totally unrelated haystack", GLOBAL_SCOPE),
            ],
        )
        .await;

        let results = service.search("needle", GLOBAL_SCOPE, None).await.unwrap();
        // The identical text survives the floor; the unrelated one (random
        // unit vector, distance ≈ 2) falls below it.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.source, "a.txt");
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty() {
        let (_tmp, service) = service_with_docs(None, &[]).await;
        let results = service.search("anything", GLOBAL_SCOPE, None).await.unwrap();
        assert!(results.is_empty());
    }
}
