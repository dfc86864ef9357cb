//! Source-tree scanner.
//!
//! Walks the configured root and produces the local file-state map: relative
//! path → (mtime, size). The key space mirrors what the repository records
//! per chunk, so the diff engine can compare the two maps directly.
//!
//! Unreadable files are logged and skipped; only a missing root is fatal.

use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use crate::config::SourcesConfig;
use crate::error::{EngineError, Result};
use crate::models::FileState;

/// Scan the source root, returning relative path → [`FileState`] for every
/// file whose extension is allowed and which no exclude glob matches.
pub fn scan_source_tree(config: &SourcesConfig) -> Result<HashMap<String, FileState>> {
    let root = &config.root;
    if !root.is_dir() {
        return Err(EngineError::Scan {
            path: root.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "source root does not exist or is not a directory",
            ),
        });
    }

    let exclude_set = build_globset(&config.exclude_globs)?;
    let extensions: Vec<String> = config
        .extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut walker = WalkDir::new(root);
    if !config.recursive {
        walker = walker.max_depth(1);
    }

    let mut state = HashMap::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel_str = relative_key(path, root);

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !has_allowed_extension(path, &extensions) {
            continue;
        }

        match file_state(path) {
            Ok(fs) => {
                state.insert(rel_str, fs);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat file, skipping");
            }
        }
    }

    Ok(state)
}

/// Relative path under `root`, with `/` separators regardless of platform so
/// stored source keys stay comparable across machines.
fn relative_key(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .map(|ext| extensions.iter().any(|allowed| *allowed == ext))
        .unwrap_or(false)
}

fn file_state(path: &Path) -> std::io::Result<FileState> {
    let metadata = std::fs::metadata(path)?;
    let mtime = metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    Ok(FileState {
        mtime,
        size: metadata.len() as i64,
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| EngineError::validation(format!("bad exclude glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| EngineError::validation(format!("cannot build exclude globs: {}", e)))
}
