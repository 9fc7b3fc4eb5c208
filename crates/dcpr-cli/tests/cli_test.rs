//! Integration tests for the `dcpr` binary
//!
//! These run commands that need no model server: configuration display and
//! index inspection.

use serial_test::serial;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn dcpr(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dcpr"))
        .current_dir(dir)
        .env_remove("DCPR_TOP_N")
        .env_remove("DCPR_INDEX_PATH")
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

fn entry<'a>(parsed: &'a serde_json::Value, key: &str) -> &'a serde_json::Value {
    parsed["data"]["entries"]
        .as_array()
        .and_then(|entries| entries.iter().find(|e| e["key"] == key))
        .unwrap_or_else(|| panic!("missing config entry {}", key))
}

#[test]
#[serial]
fn test_config_json_shows_sources() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("dcpr.toml"), "candidate_k = 40\n").unwrap();

    let output = dcpr(dir.path(), &["config", "--json", "--top-n", "5"]);
    assert!(output.status.success());

    let parsed = json(&output);
    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["data"]["valid"], true);
    assert_eq!(entry(&parsed, "candidate_k")["value"], "40");
    assert_eq!(entry(&parsed, "candidate_k")["source"], "file");
    assert_eq!(entry(&parsed, "top_n")["value"], "5");
    assert_eq!(entry(&parsed, "top_n")["source"], "cli");
    assert_eq!(entry(&parsed, "embedder")["source"], "default");
}

#[test]
#[serial]
fn test_config_reports_invalid_combination() {
    let dir = TempDir::new().unwrap();

    let output = dcpr(dir.path(), &["config", "--json", "--top-n", "30"]);
    assert!(output.status.success());

    let parsed = json(&output);
    assert_eq!(parsed["data"]["valid"], false);
    assert!(parsed["data"]["problem"].as_str().unwrap().contains("candidate_k"));
}

#[test]
#[serial]
fn test_inspect_without_index_fails() {
    let dir = TempDir::new().unwrap();

    let output = dcpr(dir.path(), &["inspect", "--index", "missing_index"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("dcpr ingest"));
}

#[test]
#[serial]
fn test_ask_without_index_fails_before_calling_models() {
    let dir = TempDir::new().unwrap();

    let output = dcpr(
        dir.path(),
        &["ask", "What is the base FSI?", "--llm", "ollama:llama3", "--index", "missing_index"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Index unavailable") || stderr.contains("missing_index"));
}
