//! Collection statistics and health overview.
//!
//! Prints a quick summary of what's indexed: chunk counts, distinct source
//! files, and database size. Used by `ddx stats` to give confidence that
//! sync runs are landing where expected.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::repository::VectorRepository;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(&config.store).await?;
    migrate::run_migrations(&pool).await?;
    let repo = VectorRepository::new(pool.clone(), config.store.collection.clone());

    let stats = repo.get_collection_stats().await?;
    let state = repo.get_indexed_file_state().await?;

    let db_size = std::fs::metadata(&config.store.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docdex — Collection Stats");
    println!("=========================");
    println!();
    println!("  Database:    {}", config.store.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Collection:  {}", stats.collection);
    println!();
    println!("  Chunks:      {}", stats.total_chunks);
    println!("  Sources:     {}", stats.unique_sources);

    if !state.is_empty() {
        let mut sources: Vec<_> = state.into_iter().collect();
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        println!();
        println!("  By source:");
        println!("  {:<48} {:>12} {}", "SOURCE", "SIZE", "MODIFIED");
        println!("  {}", "-".repeat(76));
        for (source, fs) in sources {
            println!(
                "  {:<48} {:>12} {}",
                source,
                format_bytes(fs.size.max(0) as u64),
                format_ts(fs.mtime)
            );
        }
    }

    println!();
    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
