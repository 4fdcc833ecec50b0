//! Integration tests for the `klass` binary.

use std::io::Write;
use std::process::{Command, Output};

fn klass(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_klass"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run klass")
}

fn bridge_file(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

// ── selftest ─────────────────────────────────────────────────────────────

#[test]
fn test_selftest_passes() {
    let output = klass(&["selftest"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {}", stdout);
    assert!(stdout.contains("BootstrapTest#test_subclass"));
    assert!(stdout.contains("13 tests, 0 failures, 0 errors"));
}

#[test]
fn test_selftest_json_feeds_bridge() {
    let output = klass(&["selftest", "--reporter", "json", "--filter", "MixinTest"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines.last().copied(),
        Some(r#"{"jstest":{"total":5,"fail":0,"error":0}}"#)
    );

    let file = bridge_file(&lines);
    let output = klass(&["bridge", file.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));
    let printed = String::from_utf8_lossy(&output.stdout);
    assert!(printed.contains("[PASS] MixinTest#test_later_include_wins"));
    assert!(printed.ends_with("5 tests, 0 failures, 0 errors\n"));
}

// ── bridge ───────────────────────────────────────────────────────────────

#[test]
fn test_bridge_failure_exit_code() {
    let file = bridge_file(&[
        r#"{"jstest":{"status":"pass","test":"A#test_one"}}"#,
        "garbage that is skipped",
        r#"{"jstest":{"status":"fail","test":"A#test_two"}}"#,
        r#"{"jstest":{"total":2,"fail":1,"error":0}}"#,
    ]);
    let output = klass(&["bridge", file.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "[PASS] A#test_one\n[FAIL] A#test_two\n2 tests, 1 failures, 0 errors\n"
    );
}

#[test]
fn test_bridge_without_summary_fails() {
    let file = bridge_file(&[r#"{"jstest":{"status":"pass","test":"A#test_one"}}"#]);
    let output = klass(&["bridge", file.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_bridge_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.jsonl");
    let output = klass(&["bridge", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to open"));
}
