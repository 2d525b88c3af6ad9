//! Binary tests. None of these reach a live model.
#![allow(clippy::unwrap_used)]

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_help_lists_flags_and_config() -> Result<()> {
    let mut cmd = Command::cargo_bin("docsmith")?;
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-only"))
        .stdout(predicate::str::contains("--diff"))
        .stdout(predicate::str::contains("--skip-dunder"))
        .stdout(predicate::str::contains(".docsmith.toml"));
    Ok(())
}

#[test]
fn test_missing_paths_argument_fails() -> Result<()> {
    let mut cmd = Command::cargo_bin("docsmith")?;
    cmd.assert().failure();
    Ok(())
}

#[test]
fn test_nonexistent_path_fails() -> Result<()> {
    let mut cmd = Command::cargo_bin("docsmith")?;
    cmd.arg("does/not/exist.py")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn test_parse_failure_exits_one_and_leaves_file() -> Result<()> {
    let temp = TempDir::new()?;
    let py_file = temp.path().join("broken.py");
    fs::write(&py_file, "def broken(:\n    pass\n")?;

    let mut cmd = Command::cargo_bin("docsmith")?;
    cmd.arg(&py_file)
        .args(["--host", "http://127.0.0.1:9", "--timeout", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("broken.py"));

    assert_eq!(fs::read_to_string(&py_file)?, "def broken(:\n    pass\n");
    Ok(())
}

#[test]
fn test_empty_directory_succeeds() -> Result<()> {
    let temp = TempDir::new()?;
    let mut cmd = Command::cargo_bin("docsmith")?;
    cmd.arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("No Python files found"));
    Ok(())
}

#[test]
fn test_unreachable_host_skips_definitions() -> Result<()> {
    let temp = TempDir::new()?;
    let py_file = temp.path().join("mod.py");
    let source = "def add(a, b):\n    return a + b\n";
    fs::write(&py_file, source)?;

    let mut cmd = Command::cargo_bin("docsmith")?;
    cmd.arg(&py_file)
        .args(["--host", "http://127.0.0.1:9", "--timeout", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("add"))
        .stderr(predicate::str::contains("skipped"));

    assert_eq!(fs::read_to_string(&py_file)?, source);
    Ok(())
}

#[test]
fn test_diff_mode_on_documented_file_prints_nothing() -> Result<()> {
    let temp = TempDir::new()?;
    let py_file = temp.path().join("done.py");
    fs::write(&py_file, "def f():\n    \"\"\"Done.\"\"\"\n")?;

    let mut cmd = Command::cargo_bin("docsmith")?;
    cmd.arg(&py_file)
        .arg("--diff")
        .args(["--host", "http://127.0.0.1:9"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn test_config_file_is_picked_up() -> Result<()> {
    let temp = TempDir::new()?;
    fs::write(
        temp.path().join(".docsmith.toml"),
        "[docsmith]\nhost = \"http://127.0.0.1:9\"\ntimeout_secs = 1\nskip_private = true\n",
    )?;
    let py_file = temp.path().join("m.py");
    fs::write(&py_file, "def _private():\n    pass\n")?;

    // The only definition is filtered out, so no model call is attempted.
    let mut cmd = Command::cargo_bin("docsmith")?;
    cmd.arg(temp.path())
        .arg("--verbose")
        .assert()
        .success()
        .stderr(predicate::str::contains(".docsmith.toml"))
        .stderr(predicate::str::contains("[WARN]").not());
    Ok(())
}
