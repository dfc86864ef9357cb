//! Incremental sync diff.
//!
//! Pure comparison of the scanner's local file-state map against the
//! repository's recorded file state, producing the three disjoint path sets
//! a sync run acts on.

use std::collections::HashMap;

use crate::models::FileState;

/// Disjoint path sets produced by one diff. Sorted for deterministic
/// processing order and log output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDiff {
    /// Local paths the index has never seen.
    pub added: Vec<String>,
    /// Paths present on both sides whose mtime or size differs.
    pub updated: Vec<String>,
    /// Indexed paths no longer present locally.
    pub deleted: Vec<String>,
}

impl SyncDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Compare local and indexed state maps.
///
/// A path present in both with identical `(mtime, size)` is treated as
/// unchanged and appears in none of the three sets — that skip is the entire
/// point of incremental sync. Content is deliberately not hashed here: a
/// file edited without its mtime or size changing is silently missed. That
/// is an accepted limitation, traded against reading every file on every
/// scan.
pub fn compute_diff(
    local: &HashMap<String, FileState>,
    indexed: &HashMap<String, FileState>,
) -> SyncDiff {
    let mut added: Vec<String> = local
        .keys()
        .filter(|path| !indexed.contains_key(*path))
        .cloned()
        .collect();

    let mut deleted: Vec<String> = indexed
        .keys()
        .filter(|path| !local.contains_key(*path))
        .cloned()
        .collect();

    let mut updated: Vec<String> = local
        .iter()
        .filter_map(|(path, state)| match indexed.get(path) {
            Some(stored) if stored != state => Some(path.clone()),
            _ => None,
        })
        .collect();

    added.sort();
    updated.sort();
    deleted.sort();

    SyncDiff {
        added,
        updated,
        deleted,
    }
}
