//! The `docqa` binary surface.

#![allow(clippy::panic)]

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `docqa` command isolated from the caller's environment.
fn docqa(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("docqa").unwrap_or_else(|e| panic!("binary: {e}"));
    cmd.current_dir(dir.path())
        .env_clear()
        .env("HOME", dir.path())
        .env("OPENAI_API_KEY", "sk-test")
        .env("VECTORDB_PATH", dir.path().join("vectordb.sqlite3"))
        .env("DOCQA_PROMPT_DIR", dir.path().join("prompts"));
    cmd
}

#[test]
fn help_lists_commands() {
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    docqa(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("init-prompts"));
}

#[test]
fn status_with_missing_index() {
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    docqa(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("🔧 Configuration Status:"))
        .stdout(predicate::str::contains("OpenAI API Key: ✅ Set"))
        .stdout(predicate::str::contains("Vector Database: ❌ Missing"))
        .stdout(predicate::str::contains("MCP Servers: ⚪ None"));
}

#[test]
fn status_json_counts_chunks() {
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    common::write_index(temp.path(), "documents");

    let output = docqa(&temp)
        .args(["--format", "json", "status"])
        .env("MCP_SERVER_URLS", "http://a:1, http://b:2/mcp")
        .output()
        .unwrap_or_else(|e| panic!("run: {e}"));
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|e| panic!("not JSON ({e})"));
    assert_eq!(value["index"]["chunk_count"], 3);
    assert_eq!(value["config"]["index_found"], true);
    assert_eq!(value["config"]["remote_configured"], true);
    assert_eq!(value["config"]["endpoints"][1], "http://b:2/mcp");
}

#[test]
fn init_prompts_writes_templates_once() {
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let dir = temp.path().join("custom");

    docqa(&temp)
        .args(["init-prompts", "--dir"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 prompt template(s)"));

    docqa(&temp)
        .args(["init-prompts", "--dir"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}

#[test]
fn tools_without_remote_lists_document_search() {
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    docqa(&temp)
        .args(["tools", "--no-remote"])
        .env("MCP_SERVER_URLS", "http://127.0.0.1:9")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 tool(s) available"))
        .stdout(predicate::str::contains("document_search"));
}

#[test]
fn empty_question_fails() {
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    docqa(&temp)
        .args(["ask", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("question must not be empty"));
}
