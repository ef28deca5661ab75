//! Integration tests for configuration layering.
//!
//! Tests the full priority chain: hardcoded defaults < XDG config < project config < CLI args

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use imagewatch_test_support::FixtureFiles;
use predicates::prelude::*;

/// Writes `contents` as the XDG config under `config_home`.
fn write_xdg_config(config_home: &Path, contents: &str) {
    let dir = config_home.join("imagewatch");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), contents).unwrap();
}

fn imagewatch(config_home: &Path, cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("imagewatch").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home).current_dir(cwd);
    cmd
}

#[test]
fn test_defaults_without_config() {
    let home = tempfile::tempdir().unwrap();

    imagewatch(home.path(), home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout_ms = 10000"))
        .stdout(predicate::str::contains("format = \"jsonl\""))
        .stdout(predicate::str::contains("recursive = false"));
}

#[test]
fn test_xdg_config_applies() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(home.path(), "[tracker]\ntimeout_ms = 1234\n");

    imagewatch(home.path(), home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout_ms = 1234"));
}

#[test]
fn test_project_config_overrides_xdg() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    write_xdg_config(home.path(), "[tracker]\ntimeout_ms = 1234\n\n[output]\npretty = true\n");
    fs::write(
        project.path().join(".imagewatch.toml"),
        "[tracker]\ntimeout_ms = 99\n",
    )
    .unwrap();

    imagewatch(home.path(), project.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout_ms = 99"))
        .stdout(predicate::str::contains("pretty = true"));
}

#[test]
fn test_project_config_found_in_parent() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let nested = project.path().join("photos").join("2024");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        project.path().join(".imagewatch.toml"),
        "[general]\nrecursive = true\n",
    )
    .unwrap();

    imagewatch(home.path(), &nested)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("recursive = true"));
}

#[test]
fn test_project_config_applies_format() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    fs::write(
        project.path().join(".imagewatch.toml"),
        r"
[output]
format = 'json'
",
    )
    .unwrap();
    let image = FixtureFiles::png(project.path(), "a.png", 4, 4).unwrap();

    // Output should be a single JSON object per config
    imagewatch(home.path(), project.path())
        .arg("--quiet")
        .arg(&image)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("{\"images\""));
}

#[test]
fn test_cli_overrides_project_config() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    fs::write(
        project.path().join(".imagewatch.toml"),
        r"
[output]
format = 'json'
",
    )
    .unwrap();
    let image = FixtureFiles::png(project.path(), "a.png", 4, 4).unwrap();

    let output = imagewatch(home.path(), project.path())
        .arg("--quiet")
        .arg("--format")
        .arg("jsonl") // CLI overrides config
        .arg(&image)
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.starts_with("{\"index\""));
}

#[test]
fn test_config_enables_recursion() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let sub = project.path().join("sub");
    fs::create_dir(&sub).unwrap();
    FixtureFiles::corrupt(&sub, "bad.png").unwrap();
    fs::write(
        project.path().join(".imagewatch.toml"),
        "[general]\nrecursive = true\n",
    )
    .unwrap();

    imagewatch(home.path(), project.path())
        .arg("--quiet")
        .arg(project.path())
        .assert()
        .code(1);
}

#[test]
fn test_invalid_config_value_warns() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(home.path(), "[output]\nformat = 'xml'\n");

    imagewatch(home.path(), home.path())
        .arg("config")
        .assert()
        .success()
        .stderr(predicate::str::contains("output.format"));
}

#[test]
fn test_unparsable_config_ignored() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(home.path(), "[tracker\ntimeout_ms = 5\n");

    imagewatch(home.path(), home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout_ms = 10000"));
}
