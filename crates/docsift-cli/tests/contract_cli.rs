//! CLI contract tests: stdout/stderr shape and exit codes.

use std::path::PathBuf;
use std::process::{Command, Output};

fn docsift(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_docsift"))
        .args(args)
        .output()
        .expect("binary runs")
}

fn write_fixture(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[test]
fn test_plain_text_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "note.txt", b"hello cli");

    let output = docsift(&[path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "hello cli");
    assert!(output.stderr.is_empty());
}

#[test]
fn test_json_output_is_tagged() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "note.txt", b"json me");

    let output = docsift(&["--json", path.to_str().unwrap()]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["_type"], "PlainTextContent");
    assert_eq!(value["content"], "json me");
    assert_eq!(value["metadata"]["_type"], "FileMetadata");
}

#[test]
fn test_json_unit_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "note.txt", b"unit me");

    let output = docsift(&["--json-unit", path.to_str().unwrap()]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let units = value.as_array().unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0]["_type"], "Unit");
    assert_eq!(units[0]["number"], 1);
    assert_eq!(units[0]["text"], "unit me");
}

#[test]
fn test_unknown_flag_warns_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "note.txt", b"x");

    let output = docsift(&["--frobnicate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("warning: unsupported arguments"));
}

#[test]
fn test_binary_requires_json_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "note.txt", b"x");

    let output = docsift(&["--binary", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("docsift:"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_unsupported_format_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "prog.exe", b"MZ");

    let output = docsift(&[path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("docsift:"));
    assert!(stderr.contains("not supported"));
    // No partial output on failure.
    assert!(output.stdout.is_empty());
}

#[test]
fn test_missing_file_fails_cleanly() {
    let output = docsift(&["/no/such/file.txt"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("docsift:"));
}
