//! Integration tests for the command-line interface
//!
//! Drives the built binary: flags, report output, and exit status

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to create a workspace with one text file and a rules file
fn setup_test_workspace(rules: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("greeting.txt"),
        "hello world\nthis is a foo test\ngoodbye foo\n",
    )
    .unwrap();
    fs::write(dir.path().join("rules.json"), rules).unwrap();
    dir
}

const RULES: &str = r#"[
    {"path": "greeting.txt", "rules": [
        {"search": "foo", "replace": "bar"},
        {"search": "hello", "replace": "hi"}
    ]}
]"#;

fn source_modifier(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_source-modifier"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let output = source_modifier(dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--plan"));
    assert!(stdout.contains("--apply"));
    assert!(stdout.contains("--output"));
}

#[test]
fn test_plan_is_default() {
    let dir = setup_test_workspace(RULES);
    let output = source_modifier(dir.path(), &["rules.json"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Processing file: greeting.txt"));
    assert!(stdout.contains("3 change(s) planned"));
    assert!(stdout.contains("Summary:"));
    assert_eq!(
        fs::read_to_string(dir.path().join("greeting.txt")).unwrap(),
        "hello world\nthis is a foo test\ngoodbye foo\n"
    );
}

#[test]
fn test_apply_rewrites_and_writes_csv() {
    let dir = setup_test_workspace(RULES);
    let output = source_modifier(dir.path(), &["rules.json", "--apply", "-o", "out.csv"]);

    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(dir.path().join("greeting.txt")).unwrap(),
        "hi world\nthis is a bar test\ngoodbye bar\n"
    );

    let csv = fs::read_to_string(dir.path().join("out.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("file,line_number,old_line,new_line,search_text,replace_text,occurrences")
    );
    assert_eq!(lines.count(), 3);
}

#[test]
fn test_format_flag_overrides_extension() {
    let dir = setup_test_workspace(RULES);
    let output = source_modifier(dir.path(), &["rules.json", "-o", "out.log", "--format", "json"]);

    assert!(output.status.success());
    let records: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out.log")).unwrap()).unwrap();
    assert_eq!(records.len(), 3);
}

#[test]
fn test_plan_and_apply_conflict() {
    let dir = setup_test_workspace(RULES);
    let output = source_modifier(dir.path(), &["rules.json", "--plan", "--apply"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used with"));
}

#[test]
fn test_diff_shows_changed_lines() {
    let dir = setup_test_workspace(RULES);
    let output = source_modifier(dir.path(), &["rules.json", "--diff"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("-hello world"));
    assert!(stdout.contains("+hi world"));
}

#[test]
fn test_invalid_target_sets_exit_status() {
    let dir = setup_test_workspace(
        r#"[
            {"path": "missing.txt", "search": "a", "replace": "b"},
            {"path": "greeting.txt", "search": "foo", "replace": "bar"}
        ]"#,
    );
    let output = source_modifier(dir.path(), &["rules.json", "--apply"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"));
    // The valid rule set still ran
    assert!(fs::read_to_string(dir.path().join("greeting.txt"))
        .unwrap()
        .contains("bar"));
}

#[test]
fn test_invalid_config_fails_before_touching_files() {
    let dir = setup_test_workspace(r#"[{"path": "greeting.txt", "search": "foo"}]"#);
    let output = source_modifier(dir.path(), &["rules.json", "--apply"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"));
    assert!(fs::read_to_string(dir.path().join("greeting.txt"))
        .unwrap()
        .contains("foo"));
}

#[test]
fn test_skipped_rule_keeps_success_status() {
    let dir = setup_test_workspace(
        r#"[{"path": "greeting.txt", "jsonpath": "$.a", "replacement": 1}]"#,
    );
    let output = source_modifier(dir.path(), &["rules.json"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Skipped rule"));
}

#[test]
fn test_folder_skips_are_summarized_once() {
    let dir = setup_test_workspace(r#"[{"path": "src", "jsonpath": "$.a", "replacement": 1}]"#);
    fs::create_dir(dir.path().join("src")).unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        fs::write(dir.path().join("src").join(name), "plain text\n").unwrap();
    }
    fs::write(dir.path().join("src/d.json"), r#"{"a": 0}"#).unwrap();

    let output = source_modifier(dir.path(), &["rules.json"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Skipped rule"));
    assert_eq!(stdout.matches("skipped in").count(), 1);
    assert!(stdout.contains("3 rule(s) skipped in 3 file(s)"));
    assert!(stdout.contains("1 change(s) planned"));
}
