#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

struct TestEnv {
    _tmp: TempDir,
    base_dir: PathBuf,
    pics: PathBuf,
}

/// A base dir with a config pointing at a fake OCR engine, plus a folder of
/// "images" whose bytes are the text the engine will report.
fn setup_test_env() -> TestEnv {
    let tmp = TempDir::new().unwrap();
    let root = fs::canonicalize(tmp.path()).unwrap();

    let base_dir = root.join("home");
    fs::create_dir_all(&base_dir).unwrap();

    // Called as `<engine> <image> stdout -l <lang>`.
    let engine = root.join("fake-ocr");
    fs::write(&engine, "#!/bin/sh\ncat \"$1\"\n").unwrap();
    fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

    let pics = root.join("pics");
    fs::create_dir_all(pics.join("2024")).unwrap();
    fs::write(
        pics.join("invoice.png"),
        "ACME Corp\nInvoice 1042\nTotal due: 310 EUR\n",
    )
    .unwrap();
    fs::write(
        pics.join("2024/login.jpg"),
        "Sign in\nUsername\nPassword\n",
    )
    .unwrap();
    fs::write(pics.join("2024/blank.gif"), "").unwrap();
    fs::write(pics.join("readme.txt"), "Invoice but not an image").unwrap();

    let config = format!(
        r#"[log]
file = false

[workers]
count = 2

[ocr]
command = "{}"
"#,
        engine.display()
    );
    fs::write(base_dir.join("memex.toml"), config).unwrap();

    TestEnv {
        _tmp: tmp,
        base_dir,
        pics,
    }
}

fn run_memex(base_dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_memex"))
        .arg("--base-dir")
        .arg(base_dir)
        .arg("--progress")
        .arg("off")
        .args(args)
        .env_remove("MEMEX_LOG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run memex binary: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn scan(env: &TestEnv) -> String {
    let pics = env.pics.to_str().unwrap();
    let (stdout, stderr, success) = run_memex(&env.base_dir, &["scan", pics]);
    assert!(success, "scan failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

fn search_json(env: &TestEnv, query: &str) -> Vec<serde_json::Value> {
    let (stdout, stderr, success) = run_memex(&env.base_dir, &["search", query, "--json"]);
    assert!(success, "search failed: stderr={}", stderr);
    serde_json::from_str(&stdout).unwrap()
}

#[test]
fn test_init_creates_database() {
    let env = setup_test_env();

    let (stdout, stderr, success) = run_memex(&env.base_dir, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(env.base_dir.join("memex.db").exists());
}

#[test]
fn test_init_idempotent() {
    let env = setup_test_env();

    let (_, _, first) = run_memex(&env.base_dir, &["init"]);
    let (_, _, second) = run_memex(&env.base_dir, &["init"]);
    assert!(first && second, "init is not idempotent");
}

#[test]
fn test_scan_indexes_images() {
    let env = setup_test_env();

    let stdout = scan(&env);
    assert!(stdout.contains("images found: 3"), "{}", stdout);
    assert!(stdout.contains("queued: 3"));
    assert!(stdout.contains("stored: 3"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_rescan_skips_unchanged() {
    let env = setup_test_env();
    scan(&env);

    let (stdout, stderr, success) = run_memex(&env.base_dir, &["rescan"]);
    assert!(success, "rescan failed: {}", stderr);
    assert!(stdout.contains("roots: 1"));
    assert!(stdout.contains("queued: 0"));
    assert!(stdout.contains("unchanged: 3"));
}

#[test]
fn test_search_finds_ocr_text() {
    let env = setup_test_env();
    scan(&env);

    let (stdout, _, success) = run_memex(&env.base_dir, &["search", "invoice"]);
    assert!(success);
    assert!(stdout.contains("invoice.png"));
    assert!(!stdout.contains("readme.txt"));
    assert!(!stdout.contains("login.jpg"));

    let hits = search_json(&env, "password");
    assert_eq!(hits.len(), 1);
    assert!(hits[0]["path"].as_str().unwrap().ends_with("2024/login.jpg"));
}

#[test]
fn test_search_no_results() {
    let env = setup_test_env();
    scan(&env);

    let (stdout, _, success) = run_memex(&env.base_dir, &["search", "xyzzy"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_comment_is_searchable() {
    let env = setup_test_env();
    scan(&env);

    let hits = search_json(&env, "password");
    let id = hits[0]["id"].as_i64().unwrap().to_string();

    let (_, stderr, success) = run_memex(&env.base_dir, &["comment", &id, "staging portal"]);
    assert!(success, "comment failed: {}", stderr);

    let hits = search_json(&env, "staging");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["comment"], "staging portal");

    let (stdout, _, success) = run_memex(&env.base_dir, &["get", &id]);
    assert!(success);
    assert!(stdout.contains("staging portal"));
    assert!(stdout.contains("Username"));
}

#[test]
fn test_get_missing_document() {
    let env = setup_test_env();
    run_memex(&env.base_dir, &["init"]);

    let (_, stderr, success) = run_memex(&env.base_dir, &["get", "999"]);
    assert!(!success);
    assert!(stderr.contains("document not found"));
}

#[test]
fn test_folders_lists_scan_roots() {
    let env = setup_test_env();
    scan(&env);

    let (stdout, _, success) = run_memex(&env.base_dir, &["folders"]);
    assert!(success);
    assert!(stdout.contains(env.pics.to_str().unwrap()));
}

#[test]
fn test_sweep_removes_deleted_images() {
    let env = setup_test_env();
    scan(&env);

    fs::remove_file(env.pics.join("invoice.png")).unwrap();
    let (stdout, stderr, success) = run_memex(&env.base_dir, &["sweep"]);
    assert!(success, "sweep failed: {}", stderr);
    assert!(stdout.contains("checked: 3"));
    assert!(stdout.contains("removed: 1"));

    assert!(search_json(&env, "invoice").is_empty());
}

#[test]
fn test_stats() {
    let env = setup_test_env();
    scan(&env);

    let (stdout, _, success) = run_memex(&env.base_dir, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Images:      3"));
    assert!(stdout.contains("With text:   2 / 3"));
    assert!(stdout.contains("Index:       ok"));
}

#[test]
fn test_missing_ocr_engine_is_not_fatal() {
    let env = setup_test_env();
    fs::write(
        env.base_dir.join("memex.toml"),
        "[log]\nfile = false\n\n[ocr]\ncommand = \"/nonexistent/ocr-engine\"\n",
    )
    .unwrap();

    let stdout = scan(&env);
    assert!(stdout.contains("failed: 3"), "{}", stdout);
    assert!(stdout.contains("stored: 0"));
}
