//! Sync orchestration: one scan → diff → mutate pass against the store.
//!
//! The engine is built from explicitly injected collaborators (loader,
//! embedding provider, repository) so it can run against a temporary store
//! in tests. One run executes sequentially: stale chunks for deleted and
//! updated files are purged before any new chunk is written, so old and new
//! chunk sets for the same file never coexist across runs.
//!
//! Failure policy: a file that cannot be loaded or chunked is recorded in
//! the summary's skip list and the run continues. Embedding and storage
//! failures abort the run — a partial batch outcome is unknown, and claiming
//! counts for it would corrupt the caller's picture of the index.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::chunker::chunk_segments;
use crate::config::{ChunkingConfig, SourcesConfig, StoreConfig};
use crate::diff::{compute_diff, SyncDiff};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::identity::{chunk_id, content_hash, file_fingerprint};
use crate::loader::DocumentLoader;
use crate::models::{
    ChunkMetadata, FileState, PreparedChunk, SkippedFile, SyncSummary, METADATA_SCHEMA_VERSION,
};
use crate::repository::VectorRepository;
use crate::scanner::scan_source_tree;

pub struct SyncEngine {
    sources: SourcesConfig,
    chunking: ChunkingConfig,
    upsert_batch_size: usize,
    loader: Box<dyn DocumentLoader>,
    provider: Box<dyn EmbeddingProvider>,
    repo: VectorRepository,
}

impl SyncEngine {
    pub fn new(
        sources: SourcesConfig,
        chunking: ChunkingConfig,
        store: &StoreConfig,
        loader: Box<dyn DocumentLoader>,
        provider: Box<dyn EmbeddingProvider>,
        repo: VectorRepository,
    ) -> Self {
        Self {
            sources,
            chunking,
            upsert_batch_size: store.upsert_batch_size,
            loader,
            provider,
            repo,
        }
    }

    /// Scan and diff without mutating anything. Backs `sync --dry-run`.
    pub async fn preview(&self) -> Result<SyncDiff> {
        let local = scan_source_tree(&self.sources)?;
        let indexed = self.repo.get_indexed_file_state().await?;
        Ok(compute_diff(&local, &indexed))
    }

    /// Execute one full sync run, tagging every new chunk with `scope`.
    pub async fn run(&self, scope: &str) -> Result<SyncSummary> {
        let local = scan_source_tree(&self.sources)?;
        let indexed = self.repo.get_indexed_file_state().await?;
        let diff = compute_diff(&local, &indexed);

        info!(
            added = diff.added.len(),
            updated = diff.updated.len(),
            deleted = diff.deleted.len(),
            "diff computed"
        );

        let mut summary = SyncSummary {
            files_added: diff.added.len(),
            files_updated: diff.updated.len(),
            files_deleted: diff.deleted.len(),
            ..Default::default()
        };

        // Updated files get their stale chunks purged first: chunk ids
        // depend on (mtime, size), so the old ids would otherwise linger
        // orphaned next to the new ones.
        let mut chunks_deleted = 0u64;
        for path in diff.deleted.iter().chain(diff.updated.iter()) {
            chunks_deleted += self.repo.delete_by_source(path).await?;
        }
        summary.chunks_deleted = chunks_deleted as usize;

        let to_process: Vec<&String> = diff.added.iter().chain(diff.updated.iter()).collect();

        let mut prepared: Vec<PreparedChunk> = Vec::new();
        for path in to_process {
            match self.prepare_file(path, &local, scope) {
                Ok(chunks) => prepared.extend(chunks),
                Err(e) => {
                    warn!(source = %path, error = %e, "skipping file");
                    summary.skipped.push(SkippedFile {
                        source: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if prepared.is_empty() {
            info!("nothing to upsert");
            return Ok(summary);
        }

        // Embedding is the expensive call; batch it at the provider's limit.
        let texts: Vec<String> = prepared.iter().map(|c| c.content.clone()).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.provider.max_batch_size()) {
            vectors.extend(self.provider.embed_batch(batch).await?);
        }

        // Storage batches are sized independently of embedding batches.
        for start in (0..prepared.len()).step_by(self.upsert_batch_size) {
            let end = (start + self.upsert_batch_size).min(prepared.len());
            let batch = &prepared[start..end];

            let ids: Vec<String> = batch.iter().map(|c| c.id.clone()).collect();
            let batch_texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let batch_vectors: Vec<Vec<f32>> = vectors[start..end].to_vec();
            let metadatas: Vec<ChunkMetadata> = batch.iter().map(|c| c.metadata.clone()).collect();

            self.repo
                .upsert_batch(&ids, &batch_texts, &batch_vectors, &metadatas)
                .await?;
        }

        summary.chunks_added = prepared.len();
        info!(
            chunks_added = summary.chunks_added,
            chunks_deleted = summary.chunks_deleted,
            skipped = summary.skipped.len(),
            "sync complete"
        );
        Ok(summary)
    }

    /// Load, chunk, and annotate one file. The (mtime, size) recorded by the
    /// scan is reused for id derivation so ids agree with the diff that
    /// selected the file.
    fn prepare_file(
        &self,
        relative_path: &str,
        local: &HashMap<String, FileState>,
        scope: &str,
    ) -> Result<Vec<PreparedChunk>> {
        let state = local
            .get(relative_path)
            .copied()
            .unwrap_or(FileState { mtime: 0, size: 0 });
        let full_path: PathBuf = self.sources.root.join(relative_path);

        let bytes = std::fs::read(&full_path)
            .map_err(|e| crate::error::EngineError::load(&full_path, e.to_string()))?;
        let fingerprint = file_fingerprint(&bytes);

        let segments = self.loader.load(&full_path)?;
        let spans = chunk_segments(
            &segments,
            self.chunking.chunk_size,
            self.chunking.chunk_overlap,
        );

        let file_name = relative_path
            .rsplit('/')
            .next()
            .unwrap_or(relative_path)
            .to_string();
        let file_type = full_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let ingested_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        Ok(spans
            .into_iter()
            .map(|span| {
                let size = span.text.chars().count() as i64;
                PreparedChunk {
                    id: chunk_id(state.mtime, state.size, span.index),
                    metadata: ChunkMetadata {
                        source: relative_path.to_string(),
                        file_name: file_name.clone(),
                        file_type: file_type.clone(),
                        file_mtime: state.mtime,
                        file_size: state.size,
                        fingerprint: fingerprint.clone(),
                        chunk_index: span.index,
                        content_hash: content_hash(&span.text),
                        chunk_size: size,
                        embedding_model: self.provider.model_name().to_string(),
                        ingested_at: ingested_at.clone(),
                        scope: scope.to_string(),
                        schema_version: METADATA_SCHEMA_VERSION,
                    },
                    content: span.text,
                }
            })
            .collect())
    }
}
