use super::rule_sets;
use serde_json::{json, Value};
use source_modifier::dispatch::{FileDispatcher, Mode, RunReport};
use source_modifier::report::{ReportFormat, ReportWriter};
use source_modifier::store::FsStore;
use std::fs;
use tempfile::TempDir;

/// Two rule sets with different record shapes, each appended as its own batch.
fn run_with_report(format: ReportFormat, name: &str) -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "foo\nfoo foo\n").unwrap();
    fs::write(dir.path().join("b.json"), r#"{"k": 1}"#).unwrap();
    fs::write(dir.path().join("c.txt"), "foo\n").unwrap();

    let sets = rule_sets(
        dir.path(),
        json!([
            {"path": "a.txt", "search": "foo", "replace": "bar"},
            {"path": "b.json", "jsonpath": "$.k", "replacement": 2},
            {"path": "c.txt", "search": "foo", "replace": "baz"}
        ]),
    );

    let report_path = dir.path().join(name);
    let mut writer = ReportWriter::new(&report_path, format);
    let dispatcher = FileDispatcher::new(FsStore, Mode::Plan).exclude(&report_path);
    for set in &sets {
        let mut report = RunReport::default();
        dispatcher.run_rule_set(set, &mut report).unwrap();
        let records: Vec<_> = report.records().cloned().collect();
        writer.write_batch(&records).unwrap();
    }

    let text = fs::read_to_string(&report_path).unwrap();
    (dir, text)
}

#[test]
fn csv_header_once_per_shape_run() {
    let (_dir, text) = run_with_report(ReportFormat::Csv, "report.csv");
    let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("file,")).collect();
    assert_eq!(
        headers,
        vec![
            "file,line_number,old_line,new_line,search_text,replace_text,occurrences",
            "file,json_path,old_value,new_value",
            "file,line_number,old_line,new_line,search_text,replace_text,occurrences",
        ]
    );
    assert_eq!(text.lines().count(), 3 + 2 + 1 + 1);
}

#[test]
fn json_report_is_one_array() {
    let (_dir, text) = run_with_report(ReportFormat::Json, "report.json");
    let records: Vec<Value> = serde_json::from_str(&text).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records[1]["occurrences"], 2);
    assert_eq!(records[2]["kind"], "json_replace");
    assert_eq!(records[2]["new_value"], 2);
}

#[test]
fn txt_report_lists_every_record() {
    let (_dir, text) = run_with_report(ReportFormat::Txt, "report.txt");
    assert_eq!(text.matches("File: ").count(), 4);
    assert!(text.contains("  JSON Path: $.k\n  Old Value: 1\n  New Value: 2\n"));
}

#[test]
fn report_file_is_excluded_from_folder_walks() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "foo\n").unwrap();
    let report_path = dir.path().join("report.txt");

    let sets = rule_sets(
        dir.path(),
        json!([{"path": ".", "search": "foo", "replace": "bar"}]),
    );
    let mut writer = ReportWriter::new(&report_path, ReportFormat::Txt);
    let dispatcher = FileDispatcher::new(FsStore, Mode::Apply).exclude(&report_path);

    // Two passes: the second must not pick up "foo" from the first report
    for _ in 0..2 {
        let mut report = RunReport::default();
        dispatcher.run_rule_set(&sets[0], &mut report).unwrap();
        assert!(report.files.iter().all(|f| f.path != report_path));
        let records: Vec<_> = report.records().cloned().collect();
        writer.write_batch(&records).unwrap();
    }

    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "bar\n");
}
