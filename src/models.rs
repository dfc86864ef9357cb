//! Core data models used throughout docdex.
//!
//! These types represent the file states, chunks, and search results that
//! flow through the sync and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Reserved scope tag for globally visible documents. Chunks ingested under
/// this tag are returned to every retrieval query regardless of the caller's
/// own scope.
pub const GLOBAL_SCOPE: &str = "system";

/// Version written into every chunk's metadata so future metadata additions
/// don't silently break file-state reconstruction.
pub const METADATA_SCHEMA_VERSION: i64 = 1;

/// The observable state of one source file: its modification time (Unix
/// seconds) and size in bytes. Keyed by root-relative path on both the
/// scanner and repository sides so the two maps compare directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileState {
    pub mtime: i64,
    pub size: i64,
}

/// Fixed metadata record attached to every stored chunk.
///
/// `source` is the root-relative path of the originating file and doubles as
/// the deletion key for `delete_by_source`. `scope` partitions visibility
/// between [`GLOBAL_SCOPE`] and session-private documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub file_name: String,
    pub file_type: String,
    pub file_mtime: i64,
    pub file_size: i64,
    pub fingerprint: String,
    pub chunk_index: i64,
    pub content_hash: String,
    pub chunk_size: i64,
    pub embedding_model: String,
    pub ingested_at: String,
    pub scope: String,
    pub schema_version: i64,
}

/// A chunk fully prepared for upsert: deterministic id, text, and metadata.
/// The embedding vector is attached later, after the batched provider call.
#[derive(Debug, Clone)]
pub struct PreparedChunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// One ranked retrieval result.
///
/// `distance` is the raw store metric (squared Euclidean, smaller = closer);
/// `similarity = exp(-distance)` is its bounded, rank-preserving transform in
/// `(0, 1]` used for ordering, thresholding, and display.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub distance: f64,
    pub similarity: f64,
}

/// A file skipped during a sync run, with the reason it was skipped.
/// Collected into [`SyncSummary`] so "file skipped" vs "run aborted" is an
/// explicit, testable outcome rather than a logging side effect.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub source: String,
    pub reason: String,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    pub files_added: usize,
    pub files_updated: usize,
    pub files_deleted: usize,
    pub chunks_added: usize,
    pub chunks_deleted: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Collection health snapshot reported by `get_collection_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub total_chunks: i64,
    pub unique_sources: i64,
    pub collection: String,
}
