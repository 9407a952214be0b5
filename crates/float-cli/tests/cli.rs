//! CLI command integration tests.
//! Each test uses a temp directory via FLOAT_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const THREAD: &str = "\
Assistant: How can I help with the archive today?
User: The archive search feels slow lately.
User: Can we rebuild the archive index?
Assistant: Rebuilding the index should restore archive speed.
User: decision:: rebuild the index tonight";

fn float_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("floatctl").unwrap();
    cmd.env("FLOAT_DATA_DIR", data_dir.path());
    // Keep the oracle out of tests regardless of the host environment.
    cmd.env_remove("FLOAT_ORACLE_URL");
    cmd.env("FLOAT_CONFIG", data_dir.path().join("no-config.toml"));
    cmd
}

/// Run `parse` on a thread file and return the new document id.
fn parse_thread(dir: &TempDir, name: &str) -> String {
    let input = dir.path().join(name);
    std::fs::write(&input, THREAD).unwrap();

    let output = float_cmd(dir).arg("parse").arg(&input).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .split_whitespace()
        .next()
        .expect("parse should print the document id")
        .to_string()
}

#[test]
fn list_fresh_db() {
    let dir = TempDir::new().unwrap();
    float_cmd(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("no documents stored"));
}

#[test]
fn parse_then_list() {
    let dir = TempDir::new().unwrap();
    let id = parse_thread(&dir, "thread.txt");

    float_cmd(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(&id))
        .stdout(predicate::str::contains("thread"));
}

#[test]
fn parse_reports_counts() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("counts.txt");
    std::fs::write(&input, THREAD).unwrap();

    float_cmd(&dir)
        .arg("parse")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("5 nodes"));
}

#[test]
fn stats_shows_patterns() {
    let dir = TempDir::new().unwrap();
    let id = parse_thread(&dir, "stats.txt");

    float_cmd(&dir)
        .args(["stats", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"patterns\""))
        .stdout(predicate::str::contains("\"persona_switches\""));
}

#[test]
fn query_inline_json() {
    let dir = TempDir::new().unwrap();
    let id = parse_thread(&dir, "query.txt");

    float_cmd(&dir)
        .args([
            "query",
            &id,
            r#"{"where": {"contains": {"text": "archive"}}}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"nodes\""));
}

#[test]
fn query_unknown_field_fails() {
    let dir = TempDir::new().unwrap();
    let id = parse_thread(&dir, "badquery.txt");

    float_cmd(&dir)
        .args(["query", &id, r#"{"wehre": {}}"#])
        .assert()
        .failure();
}

#[test]
fn query_from_file() {
    let dir = TempDir::new().unwrap();
    let id = parse_thread(&dir, "filequery.txt");

    let query_path = dir.path().join("q.json");
    std::fs::write(&query_path, r#"{"where": {"role": "human"}}"#).unwrap();

    float_cmd(&dir)
        .args(["query", &id])
        .arg(format!("@{}", query_path.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"nodes\""));
}

#[test]
fn extract_fragments() {
    let dir = TempDir::new().unwrap();
    let id = parse_thread(&dir, "extract.txt");

    float_cmd(&dir)
        .args(["extract", &id, "archive index", "--max", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keyword-match"))
        .stdout(predicate::str::contains("matched"));
}

#[test]
fn concepts_listed() {
    let dir = TempDir::new().unwrap();
    let id = parse_thread(&dir, "concepts.txt");

    float_cmd(&dir)
        .args(["concepts", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("archive"));
}

#[test]
fn export_import_roundtrip() {
    let dir = TempDir::new().unwrap();
    let id = parse_thread(&dir, "roundtrip.txt");

    let export_path = dir.path().join("doc.json");
    float_cmd(&dir)
        .args(["export", &id])
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported"));
    assert!(export_path.exists(), "export file should exist");

    // Import into a separate database.
    let other = TempDir::new().unwrap();
    float_cmd(&other)
        .arg("import")
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("imported"))
        .stdout(predicate::str::contains(&id));

    float_cmd(&other)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"conversation\""));
}

#[test]
fn show_missing_document_fails() {
    let dir = TempDir::new().unwrap();
    float_cmd(&dir)
        .args(["show", "00000000-0000-0000-0000-000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no document"));
}

#[test]
fn missing_required_args() {
    let dir = TempDir::new().unwrap();

    float_cmd(&dir)
        .arg("parse")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));

    float_cmd(&dir)
        .arg("query")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));

    float_cmd(&dir)
        .arg("extract")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}
