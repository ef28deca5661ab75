//! Output format validation tests.
//!
//! Tests JSON/JSONL output format correctness and required field presence.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::Path;

use assert_cmd::Command;
use imagewatch_test_support::FixtureFiles;
use serde_json::Value;
use tempfile::TempDir;

/// Directory holding two good images and one corrupt one.
fn mixed_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    FixtureFiles::png(dir.path(), "a.png", 8, 8).unwrap();
    FixtureFiles::corrupt(dir.path(), "b.png").unwrap();
    FixtureFiles::png(dir.path(), "c.png", 16, 4).unwrap();
    dir
}

fn run(args: &[&str], path: &Path) -> (Option<i32>, String) {
    let home = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("imagewatch").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .current_dir(home.path())
        .arg("--quiet")
        .args(args)
        .arg(path);
    let output = cmd.output().unwrap();
    (
        output.status.code(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
    )
}

fn jsonl(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// === JSONL Format Tests ===

#[test]
fn test_jsonl_format_single_object_per_line() {
    let dir = mixed_dir();
    let (_, stdout) = run(&["--format", "jsonl"], dir.path());

    for value in jsonl(&stdout) {
        assert!(value.is_object(), "JSONL line should be an object");
    }
}

#[test]
fn test_jsonl_one_line_per_image_then_summary() {
    let dir = mixed_dir();
    let (code, stdout) = run(&["--format", "jsonl"], dir.path());
    let lines = jsonl(&stdout);

    assert_eq!(code, Some(1));
    assert_eq!(lines.len(), 4);
    for line in &lines[..3] {
        assert!(line["index"].is_u64());
        assert!(line["src"].is_string());
        assert!(line["outcome"] == "proper" || line["outcome"] == "broken");
    }
    assert!(lines[3]["summary"].is_object());
}

#[test]
fn test_jsonl_indices_cover_every_image() {
    let dir = mixed_dir();
    let (_, stdout) = run(&[], dir.path());
    let lines = jsonl(&stdout);

    let mut indices: Vec<u64> = lines[..3]
        .iter()
        .map(|line| line["index"].as_u64().unwrap())
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_jsonl_broken_image_is_marked() {
    let dir = mixed_dir();
    let (_, stdout) = run(&[], dir.path());
    let lines = jsonl(&stdout);

    let broken: Vec<&Value> = lines[..3]
        .iter()
        .filter(|line| line["outcome"] == "broken")
        .collect();
    assert_eq!(broken.len(), 1);
    assert!(broken[0]["src"].as_str().unwrap().ends_with("b.png"));
    assert_eq!(broken[0]["index"], 1);
}

// === JSON Format Tests ===

#[test]
fn test_json_format_is_single_object() {
    let dir = mixed_dir();
    let (code, stdout) = run(&["--format", "json"], dir.path());

    assert_eq!(code, Some(1));
    assert_eq!(stdout.trim().lines().count(), 1);
    let value: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["images"].as_array().unwrap().len(), 3);
    assert!(value["summary"].is_object());
}

#[test]
fn test_json_format_empty_images_for_no_images() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout) = run(&["--format", "json"], dir.path());

    assert_eq!(code, Some(0));
    let value: Value = serde_json::from_str(&stdout).unwrap();
    assert!(value["images"].as_array().unwrap().is_empty());
    assert_eq!(value["summary"]["status"], "done");
    assert_eq!(value["summary"]["total"], 0);
}

#[test]
fn test_pretty_format_is_indented() {
    let dir = mixed_dir();
    let (_, stdout) = run(&["--format", "json", "--pretty"], dir.path());

    assert!(stdout.lines().count() > 1);
    assert!(stdout.contains("  \"images\""));
    let _: Value = serde_json::from_str(&stdout).unwrap();
}

#[test]
fn test_non_pretty_format_is_compact() {
    let dir = mixed_dir();
    let (_, stdout) = run(&["--format", "json"], dir.path());

    assert_eq!(stdout.trim().lines().count(), 1);
}

#[test]
fn test_pretty_ignored_for_jsonl() {
    let dir = mixed_dir();
    let (_, stdout) = run(&["--format", "jsonl", "--pretty"], dir.path());

    assert_eq!(jsonl(&stdout).len(), 4);
}

// === Summary Fields ===

#[test]
fn test_summary_has_required_fields() {
    let dir = mixed_dir();
    let (_, stdout) = run(&["--format", "json"], dir.path());
    let value: Value = serde_json::from_str(&stdout).unwrap();
    let summary = &value["summary"];

    assert_eq!(summary["status"], "failed");
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["proper"], 2);
    assert_eq!(summary["broken"], 1);
    let sources = summary["broken_sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert!(sources[0].as_str().unwrap().ends_with("b.png"));
}

#[test]
fn test_summary_timestamp_is_rfc3339() {
    let dir = mixed_dir();
    let (_, stdout) = run(&["--format", "json"], dir.path());
    let value: Value = serde_json::from_str(&stdout).unwrap();
    let timestamp = value["summary"]["timestamp"].as_str().unwrap();

    assert!(timestamp.contains('T'), "timestamp should be ISO 8601: {timestamp}");
    assert!(
        timestamp.ends_with('Z') || timestamp.contains('+'),
        "timestamp should carry a UTC offset: {timestamp}"
    );
}
