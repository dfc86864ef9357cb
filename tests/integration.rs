use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ddx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ddx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(
        docs_dir.join("alpha.md"),
        "# Alpha Document\n\nThis is the alpha document about Rust programming.\n\nIt contains information about cargo and crates.",
    ).unwrap();
    fs::write(
        docs_dir.join("beta.md"),
        "# Beta Document\n\nThis document discusses Python and machine learning.\n\nDeep learning frameworks like PyTorch are covered.",
    ).unwrap();
    fs::write(
        docs_dir.join("gamma.txt"),
        "Gamma plain text file.\n\nContains notes about deployment and infrastructure.\n\nKubernetes and Docker are mentioned here.",
    ).unwrap();

    // The hashed provider keeps these tests offline and deterministic.
    let config_content = format!(
        r#"[store]
path = "{}/data/docdex.sqlite"

[chunking]
chunk_size = 500
chunk_overlap = 50

[embedding]
provider = "hashed"
dims = 64

[retrieval]
top_k = 5

[sources]
root = "{}/docs"
extensions = ["md", "txt"]
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("docdex.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ddx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ddx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ddx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ddx(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ddx(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ddx(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_sync_ingests_source_root() {
    let (_tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    let (stdout, stderr, success) = run_ddx(&config_path, &["sync"]);
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files added:    3"));
    assert!(stdout.contains("files updated:  0"));
    assert!(stdout.contains("files deleted:  0"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_resync_is_noop() {
    let (_tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    run_ddx(&config_path, &["sync"]);

    let (stdout, stderr, success) = run_ddx(&config_path, &["sync"]);
    assert!(success, "resync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files added:    0"));
    assert!(stdout.contains("files updated:  0"));
    assert!(stdout.contains("files deleted:  0"));
    assert!(stdout.contains("chunks added:   0"));
    assert!(stdout.contains("chunks deleted: 0"));
}

#[test]
fn test_modified_file_is_reindexed() {
    let (tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    run_ddx(&config_path, &["sync"]);

    // Change the size so the diff fires even if mtime granularity is coarse.
    fs::write(
        tmp.path().join("docs/alpha.md"),
        "# Alpha Document\n\nCompletely rewritten, now about async runtimes instead.",
    )
    .unwrap();

    let (stdout, stderr, success) = run_ddx(&config_path, &["sync"]);
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files added:    0"));
    assert!(stdout.contains("files updated:  1"));
    assert!(stdout.contains("files deleted:  0"));
}

#[test]
fn test_deleted_file_is_purged() {
    let (tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    run_ddx(&config_path, &["sync"]);

    fs::remove_file(tmp.path().join("docs/gamma.txt")).unwrap();

    let (stdout, stderr, success) = run_ddx(&config_path, &["sync"]);
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files deleted:  1"));
    assert!(stdout.contains("chunks deleted: 1"));
}

#[test]
fn test_sync_dry_run_reports_without_mutating() {
    let (_tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    let (stdout, _, success) = run_ddx(&config_path, &["sync", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("to add:    3"));

    // Nothing was written, so a real sync still sees everything as new.
    let (stdout, _, _) = run_ddx(&config_path, &["sync"]);
    assert!(stdout.contains("files added:    3"));
}

#[test]
fn test_search_returns_ranked_results() {
    let (_tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    run_ddx(&config_path, &["sync"]);

    let (stdout, stderr, success) = run_ddx(&config_path, &["search", "Rust programming"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("1. ["));
    assert!(stdout.contains("alpha.md") || stdout.contains("beta.md") || stdout.contains("gamma.txt"));
    assert!(stdout.contains("excerpt:"));
}

#[test]
fn test_search_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    let (stdout, _, success) = run_ddx(&config_path, &["search", "anything"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_scoped_sync_and_search_isolation() {
    let (tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    run_ddx(&config_path, &["sync", "--scope", "session-a"]);

    // A different session sees nothing; the owning session sees its chunks.
    let (stdout, _, success) =
        run_ddx(&config_path, &["search", "Rust programming", "--scope", "session-b"]);
    assert!(success);
    assert!(stdout.contains("No results."), "stdout={}", stdout);

    let (stdout, _, success) =
        run_ddx(&config_path, &["search", "Rust programming", "--scope", "session-a"]);
    assert!(success);
    assert!(stdout.contains("scope: session-a"), "stdout={}", stdout);

    // Re-tag everything as global by forcing a reindex under the default scope.
    fs::write(
        tmp.path().join("docs/alpha.md"),
        "# Alpha Document\n\nGlobal copy, visible from every session now.",
    )
    .unwrap();
    run_ddx(&config_path, &["sync"]);

    let (stdout, _, success) =
        run_ddx(&config_path, &["search", "Global copy", "--scope", "session-b"]);
    assert!(success);
    assert!(stdout.contains("alpha.md"), "stdout={}", stdout);
}

#[test]
fn test_search_top_k_limits_results() {
    let (_tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    run_ddx(&config_path, &["sync"]);

    let (stdout, _, success) = run_ddx(&config_path, &["search", "document", "--top-k", "1"]);
    assert!(success);
    assert!(stdout.contains("1. ["));
    assert!(!stdout.contains("2. ["));
}

#[test]
fn test_stats_reports_collection() {
    let (_tmp, config_path) = setup_test_env();

    run_ddx(&config_path, &["init"]);
    run_ddx(&config_path, &["sync"]);

    let (stdout, stderr, success) = run_ddx(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Collection Stats"));
    assert!(stdout.contains("Sources:     3"));
    assert!(stdout.contains("alpha.md"));
}

#[test]
fn test_missing_config_fails_cleanly() {
    let tmp = TempDir::new().unwrap();
    let bogus = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_ddx(&bogus, &["init"]);
    assert!(!success);
    assert!(stderr.contains("config"), "stderr={}", stderr);
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(
        &bad,
        format!(
            r#"[store]
path = "{}/data/docdex.sqlite"

[chunking]
chunk_size = 100
chunk_overlap = 200

[sources]
root = "{}/docs"
"#,
            tmp.path().display(),
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_ddx(&bad, &["init"]);
    assert!(!success);
    assert!(stderr.contains("chunk_overlap"), "stderr={}", stderr);
}
