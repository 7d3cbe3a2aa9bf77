use super::rule_sets;
use serde_json::json;
use source_modifier::dispatch::{FileDispatcher, FileError, Mode, RunReport};
use source_modifier::store::FsStore;
use source_modifier::RuleError;
use std::fs;
use tempfile::TempDir;

fn setup_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/nested")).unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();

    fs::write(dir.path().join("src/a.txt"), "old_name();\nkeep\n").unwrap();
    fs::write(dir.path().join("src/nested/b.txt"), "call old_name\n").unwrap();
    fs::write(dir.path().join("src/c.json"), "{\"name\": \"old_name\"}\n").unwrap();
    fs::write(dir.path().join(".git/config"), "old_name\n").unwrap();
    fs::write(dir.path().join("src/blob.bin"), [0xff, 0x00, 0xfe]).unwrap();
    dir
}

#[test]
fn folder_walk_visits_text_and_json_in_name_order() {
    let dir = setup_tree();
    let sets = rule_sets(
        dir.path(),
        json!([{"path": "src", "search": "old_name", "replace": "new_name"}]),
    );

    let dispatcher = FileDispatcher::new(FsStore, Mode::Apply);
    let mut report = RunReport::default();
    dispatcher.run_rule_set(&sets[0], &mut report).unwrap();

    let touched: Vec<String> = report
        .files
        .iter()
        .filter(|f| !f.records.is_empty())
        .map(|f| {
            f.path
                .strip_prefix(dir.path())
                .unwrap()
                .display()
                .to_string()
        })
        .collect();
    assert_eq!(touched, vec!["src/a.txt", "src/c.json", "src/nested/b.txt"]);
    assert_eq!(report.binary.len(), 1);
    assert!(!report.has_failures());

    assert_eq!(
        fs::read_to_string(dir.path().join("src/a.txt")).unwrap(),
        "new_name();\nkeep\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("src/c.json")).unwrap(),
        "{\n    \"name\": \"new_name\"\n}\n"
    );
}

#[test]
fn git_directories_are_never_touched() {
    let dir = setup_tree();
    let sets = rule_sets(
        dir.path(),
        json!([{"path": ".", "search": "old_name", "replace": "new_name"}]),
    );

    let mut report = RunReport::default();
    FileDispatcher::new(FsStore, Mode::Apply)
        .run_rule_set(&sets[0], &mut report)
        .unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join(".git/config")).unwrap(),
        "old_name\n"
    );
    assert!(report
        .files
        .iter()
        .all(|f| !f.path.components().any(|c| c.as_os_str() == ".git")));
}

#[test]
fn plan_mode_leaves_files_byte_identical() {
    let dir = setup_tree();
    let before = fs::read(dir.path().join("src/a.txt")).unwrap();
    let sets = rule_sets(
        dir.path(),
        json!([{"path": "src", "search": "old_name", "replace": "new_name"}]),
    );

    let mut report = RunReport::default();
    FileDispatcher::new(FsStore, Mode::Plan)
        .run_rule_set(&sets[0], &mut report)
        .unwrap();

    assert_eq!(report.record_count(), 3);
    assert_eq!(fs::read(dir.path().join("src/a.txt")).unwrap(), before);
    assert!(report.files.iter().all(|f| f.saved.is_none()));
}

#[test]
fn plan_and_apply_produce_identical_records() {
    let config = json!([{"path": "src", "rules": [
        {"search": "old_name", "replace": "new_name"},
        {"line_number": 1, "insert_position": "before", "lines": ["// generated"]}
    ]}]);

    let plan_dir = setup_tree();
    let mut plan = RunReport::default();
    FileDispatcher::new(FsStore, Mode::Plan)
        .run_rule_set(&rule_sets(plan_dir.path(), config.clone())[0], &mut plan)
        .unwrap();

    let apply_dir = setup_tree();
    let mut apply = RunReport::default();
    FileDispatcher::new(FsStore, Mode::Apply)
        .run_rule_set(&rule_sets(apply_dir.path(), config)[0], &mut apply)
        .unwrap();

    let relative = |report: &RunReport, root: &std::path::Path| {
        report
            .records()
            .map(|r| {
                let mut r = r.clone();
                r.file = r.file.strip_prefix(root).unwrap().to_path_buf();
                r
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(relative(&plan, plan_dir.path()), relative(&apply, apply_dir.path()));
    assert!(!relative(&plan, plan_dir.path()).is_empty());
}

#[test]
fn failing_file_does_not_stop_the_walk() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "token\n").unwrap();
    fs::write(dir.path().join("b.json"), "{\"v\": \"token\"}").unwrap();
    fs::write(dir.path().join("c.txt"), "token\n").unwrap();

    // Path placeholders need a JSON document, so the text files fail
    let sets = rule_sets(
        dir.path(),
        json!([{"path": ".", "search": "token", "transform": "{path:$.v}-x"}]),
    );

    let mut report = RunReport::default();
    FileDispatcher::new(FsStore, Mode::Apply)
        .run_rule_set(&sets[0], &mut report)
        .unwrap();

    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f.error, FileError::Rule(RuleError::Expression { .. }))));
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "token\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("b.json")).unwrap(),
        "{\n    \"v\": \"token-x\"\n}"
    );
}

#[test]
fn missing_target_is_reported_before_any_file() {
    let dir = TempDir::new().unwrap();
    let sets = rule_sets(
        dir.path(),
        json!([{"path": "nope", "search": "a", "replace": "b"}]),
    );
    let mut report = RunReport::default();
    let err = FileDispatcher::new(FsStore, Mode::Apply)
        .run_rule_set(&sets[0], &mut report)
        .unwrap_err();
    assert!(err.to_string().contains("does not exist"));
    assert!(report.files.is_empty());
}
