//! # docdex
//!
//! An incremental document indexing and scoped vector retrieval engine for
//! retrieval-augmented generation backends.
//!
//! docdex turns a mutable folder of files into a consistent, deduplicated,
//! queryable vector index, and serves similarity-scored retrieval against it
//! with session-scoped visibility. Unchanged files are never reprocessed:
//! chunk identities are content-addressed from `(mtime, size, ordinal)`, so
//! re-ingestion is idempotent and change detection is a cheap state diff.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌──────┐   ┌───────────────────────────┐   ┌────────────┐
//! │ Scanner │──▶│ Diff │──▶│ Sync engine               │──▶│ SQLite      │
//! │ (mtime, │   │      │   │ load → chunk → embed →    │   │ vector      │
//! │  size)  │   │      │   │ upsert / delete stale     │   │ collection  │
//! └─────────┘   └──────┘   └───────────────────────────┘   └─────┬──────┘
//!                                                               │
//!                            ┌──────────────────┐              ▼
//!                            │ Retrieval service │◀── embed ── query
//!                            │ (scope-filtered)  │
//!                            └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ddx init                       # create database
//! ddx sync                       # index the configured source root
//! ddx search "deployment steps"  # scoped similarity search
//! ddx stats                      # collection health
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and the scope tag |
//! | [`identity`] | Content-addressed chunk ids and file fingerprints |
//! | [`chunker`] | Overlapping fixed-size text windows |
//! | [`scanner`] | Source-tree file-state scan |
//! | [`diff`] | Added/updated/deleted path sets |
//! | [`loader`] | Document loading seam |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`repository`] | Atomic vector-store CRUD and similarity query |
//! | [`sync`] | Ingestion orchestration |
//! | [`query`] | Scoped retrieval service |
//! | [`db`] / [`migrate`] | Database connection and schema |

pub mod chunker;
pub mod config;
pub mod db;
pub mod diff;
pub mod embedding;
pub mod error;
pub mod identity;
pub mod loader;
pub mod migrate;
pub mod models;
pub mod query;
pub mod repository;
pub mod scanner;
pub mod stats;
pub mod sync;
