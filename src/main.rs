//! # docdex CLI (`ddx`)
//!
//! Thin driver over the indexing and retrieval engine. It loads the TOML
//! config, wires the loader, embedding provider, and repository together at
//! this composition root, and relays summaries/results — all engine logic
//! lives in the library.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ddx init` | Create the SQLite database and schema (idempotent) |
//! | `ddx sync` | One incremental scan→diff→mutate run |
//! | `ddx search "<query>"` | Scoped similarity search |
//! | `ddx stats` | Collection health summary |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docdex::config::{load_config, Config};
use docdex::embedding::create_provider;
use docdex::loader::PlainTextLoader;
use docdex::models::GLOBAL_SCOPE;
use docdex::query::RetrievalService;
use docdex::repository::VectorRepository;
use docdex::sync::SyncEngine;
use docdex::{db, migrate, stats};

/// docdex — incremental document indexing and scoped vector retrieval.
#[derive(Parser)]
#[command(
    name = "ddx",
    about = "docdex — an incremental document indexing and scoped vector retrieval engine",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docdex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Run one incremental sync of the configured source root.
    ///
    /// Scans the root, diffs against the indexed state, deletes chunks of
    /// removed/changed files, then chunks, embeds, and upserts the rest.
    Sync {
        /// Scope tag assigned to every chunk written by this run.
        /// Defaults to the reserved global scope.
        #[arg(long, default_value = GLOBAL_SCOPE)]
        scope: String,

        /// Show the computed diff without mutating the store.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search indexed chunks by similarity.
    Search {
        /// The search query string.
        query: String,

        /// Scope to search in, alongside globally visible chunks.
        #[arg(long, default_value = GLOBAL_SCOPE)]
        scope: String,

        /// Maximum number of results (defaults to retrieval.top_k).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print collection statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config).await,
        Commands::Sync { scope, dry_run } => run_sync(&config, &scope, dry_run).await,
        Commands::Search {
            query,
            scope,
            top_k,
        } => run_search(&config, &query, &scope, top_k).await,
        Commands::Stats => stats::run_stats(&config).await,
    }
}

async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(&config.store).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("initialized {}", config.store.path.display());
    Ok(())
}

async fn open_repository(config: &Config) -> Result<VectorRepository> {
    let pool = db::connect(&config.store).await?;
    migrate::run_migrations(&pool).await?;
    Ok(VectorRepository::new(
        pool,
        config.store.collection.clone(),
    ))
}

async fn run_sync(config: &Config, scope: &str, dry_run: bool) -> Result<()> {
    let repo = open_repository(config).await?;
    let provider = create_provider(&config.embedding)?;
    let engine = SyncEngine::new(
        config.sources.clone(),
        config.chunking.clone(),
        &config.store,
        Box::new(PlainTextLoader),
        provider,
        repo,
    );

    if dry_run {
        let diff = engine.preview().await?;
        println!("sync {} (dry-run)", config.sources.root.display());
        println!("  to add:    {}", diff.added.len());
        println!("  to update: {}", diff.updated.len());
        println!("  to delete: {}", diff.deleted.len());
        return Ok(());
    }

    let summary = engine.run(scope).await?;
    println!("sync {}", config.sources.root.display());
    println!("  files added:    {}", summary.files_added);
    println!("  files updated:  {}", summary.files_updated);
    println!("  files deleted:  {}", summary.files_deleted);
    println!("  chunks added:   {}", summary.chunks_added);
    println!("  chunks deleted: {}", summary.chunks_deleted);
    if !summary.skipped.is_empty() {
        println!("  skipped files:  {}", summary.skipped.len());
        for skip in &summary.skipped {
            println!("    {} ({})", skip.source, skip.reason);
        }
    }
    println!("ok");
    Ok(())
}

async fn run_search(
    config: &Config,
    query: &str,
    scope: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let repo = open_repository(config).await?;
    let provider = create_provider(&config.embedding)?;
    let service = RetrievalService::new(provider, repo, config.retrieval.clone());

    let results = service.search(query, scope, top_k).await?;
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} (chunk {})",
            i + 1,
            result.similarity,
            result.metadata.source,
            result.metadata.chunk_index
        );
        let excerpt: String = result.content.chars().take(240).collect();
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " "));
        println!("    scope: {}", result.metadata.scope);
        println!();
    }
    Ok(())
}
