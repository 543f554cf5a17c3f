//! End-to-end tests for the `recall` binary.
//!
//! Providers are left disabled so nothing leaves the machine: every
//! accepted message fails at the embedding step, which exercises the
//! non-fatal ingestion path.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn recall_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("recall");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/recall.sqlite"

[index]
name = "test-archive"
dims = 4

[server]
bind = "127.0.0.1:0"
"#,
        root.display()
    );

    let config_path = config_dir.join("recall.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_recall(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = recall_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run recall binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_recall(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/recall.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_recall(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_recall(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_stats_on_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    run_recall(&config_path, &["init"]);
    let (stdout, stderr, success) = run_recall(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("test-archive"));
    assert!(stdout.contains("Vectors:     0"));
    assert!(stdout.contains("Dimension:   4"));
    assert!(stdout.contains("never"));
}

#[test]
fn test_ingest_counts_skips_and_failures() {
    let (tmp, config_path) = setup_test_env();
    let input = tmp.path().join("messages.jsonl");
    fs::write(
        &input,
        concat!(
            r#"{"id":"1","author":"alice","channel":"engineering","guild":"Racing","content":"Suspension geometry is done","created_at":"2024-03-01T10:00:00Z"}"#,
            "\n",
            r#"{"id":"2","author":"helper","bot":true,"content":"beep","created_at":"2024-03-01T10:01:00Z"}"#,
            "\n",
            r#"{"id":"3","author":"bob","content":"   ","created_at":"2024-03-01T10:02:00Z"}"#,
            "\n",
            "not json\n",
            "\n",
        ),
    )
    .unwrap();

    run_recall(&config_path, &["init"]);
    let (stdout, stderr, success) =
        run_recall(&config_path, &["ingest", input.to_str().unwrap()]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("lines read: 4"), "got: {}", stdout);
    assert!(stdout.contains("invalid: 1"));
    assert!(stdout.contains("skipped: 2"));
    assert!(stdout.contains("queued: 1"));
    // Embedding is disabled, so the queued message cannot be stored.
    assert!(stdout.contains("stored: 0"));
    assert!(stdout.contains("failed: 1"));
    assert!(stdout.contains("ok"));

    let (stdout, _, _) = run_recall(&config_path, &["stats"]);
    assert!(stdout.contains("Vectors:     0"));
}

#[test]
fn test_ask_fails_cleanly_without_embeddings() {
    let (_tmp, config_path) = setup_test_env();

    run_recall(&config_path, &["init"]);
    let (_, stderr, success) = run_recall(&config_path, &["ask", "what is new?"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_recall(&tmp.path().join("absent.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_test_env();
    let config_path = tmp.path().join("config/bad.toml");
    fs::write(
        &config_path,
        format!(
            "[db]\npath = \"{}/data/recall.sqlite\"\n\n[server]\nbind = \"127.0.0.1:0\"\n\n[retrieval]\ntop_k = 0\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_recall(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("top_k"));
}
