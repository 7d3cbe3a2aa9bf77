use super::rule_sets;
use serde_json::{json, Value};
use source_modifier::dispatch::{FileDispatcher, Mode, RunReport};
use source_modifier::record::Change;
use source_modifier::store::FsStore;
use std::fs;
use tempfile::TempDir;

fn run(dir: &TempDir, config: Value, mode: Mode) -> RunReport {
    let mut report = RunReport::default();
    for set in rule_sets(dir.path(), config) {
        FileDispatcher::new(FsStore, mode)
            .run_rule_set(&set, &mut report)
            .unwrap();
    }
    report
}

#[test]
fn structural_rules_rewrite_json_in_canonical_form() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.json");
    fs::write(
        &file,
        r#"{"user": {"name": "alice", "id": 7}, "servers": [{"port": 80}, {"port": 8080}]}"#,
    )
    .unwrap();

    let report = run(
        &dir,
        json!([{"path": "app.json", "rules": [
            {"jsonpath": "$.user.name", "replacement": "bob"},
            {"jsonpath": "$.servers[?(@.port < 1024)].port", "replacement": 443},
            {"jsonpath": "$.user.id", "transform": "{path:$.user.name}-{original}"}
        ]}]),
        Mode::Apply,
    );

    assert_eq!(report.record_count(), 3);
    let written: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(
        written,
        json!({"user": {"name": "bob", "id": "bob-7"}, "servers": [{"port": 443}, {"port": 8080}]})
    );

    let paths: Vec<&str> = report
        .records()
        .map(|r| match &r.change {
            Change::JsonReplace { json_path, .. } => json_path.as_str(),
            other => panic!("unexpected change {other:?}"),
        })
        .collect();
    assert_eq!(paths, vec!["$.user.name", "$.servers[0].port", "$.user.id"]);
}

#[test]
fn rerunning_literal_rules_reports_nothing() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.json"), r#"{"user": {"name": "alice"}}"#).unwrap();
    let config = json!([{"path": "app.json", "jsonpath": "$.user.name", "replacement": "bob"}]);

    let first = run(&dir, config.clone(), Mode::Apply);
    assert_eq!(first.record_count(), 1);
    let second = run(&dir, config, Mode::Apply);
    assert_eq!(second.record_count(), 0);
    assert!(second.files[0].saved.is_none());
}

#[test]
fn jsonpath_rule_against_text_is_skipped_with_warning() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("notes.txt");
    fs::write(&file, "hello foo\n").unwrap();

    let report = run(
        &dir,
        json!([{"path": "notes.txt", "rules": [
            {"jsonpath": "$.a", "replacement": 1},
            {"search": "foo", "replace": "bar"}
        ]}]),
        Mode::Apply,
    );

    assert_eq!(report.skipped_rules(), 1);
    assert_eq!(report.record_count(), 1);
    assert!(!report.has_failures());
    assert_eq!(fs::read_to_string(&file).unwrap(), "hello bar\n");
}

#[test]
fn search_rules_apply_to_json_text() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("deps.json");
    fs::write(&file, "{\"serde\": \"0.9\", \"log\": \"0.9\"}\n").unwrap();

    let report = run(
        &dir,
        json!([{"path": "deps.json", "rules": [
            {"search": "\"0.9\"", "replace": "\"1.0\""},
            {"jsonpath": "$.log", "replacement": "0.4"}
        ]}]),
        Mode::Apply,
    );

    assert_eq!(report.record_count(), 3);
    let written: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(written, json!({"serde": "1.0", "log": "0.4"}));
}

#[test]
fn rule_order_scenario() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("greeting.txt");
    fs::write(&file, "hello world\nthis is a foo test\ngoodbye foo").unwrap();

    let report = run(
        &dir,
        json!([{"path": "greeting.txt", "rules": [
            {"search": "foo", "replace": "bar"},
            {"search": "hello", "replace": "hi"}
        ]}]),
        Mode::Apply,
    );

    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "hi world\nthis is a bar test\ngoodbye bar"
    );
    let per_rule = |needle: &str| {
        report
            .records()
            .filter(|r| matches!(&r.change, Change::TextReplace { search_text, .. } if search_text == needle))
            .count()
    };
    assert_eq!(per_rule("foo"), 2);
    assert_eq!(per_rule("hello"), 1);
}
