use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn bin_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mvloc").expect("binary built");
    cmd.current_dir(cwd).env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// A project with two resources in the default layout and `ko`/`ja` configured.
fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("mvloc.toml"), "languages = [\"ko\", \"ja\"]\n");
    write(
        &root.join("src-en/data/events.xml.json"),
        r#"{"EVT_1": "You find a derelict ship.", "EVT_2": "Take {0} scrap"}"#,
    );
    write(&root.join("src-en/misc.json"), r#"{"OK": "OK"}"#);
    dir
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    bin_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("batch-sync").and(predicate::str::contains("schema")));
}

#[test]
fn sync_creates_locale_file_and_is_idempotent() {
    let dir = project();
    let root = dir.path();
    bin_cmd(root)
        .args(["sync", "data/events.xml:ko"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data/events.xml:ko"));

    let po = root.join("locale/data/events.xml/ko.po");
    let first = fs::read_to_string(&po).unwrap();
    assert!(first.contains("msgctxt \"EVT_1\""));
    assert!(first.contains("#, missing"));

    bin_cmd(root)
        .args(["sync", "data/events.xml:ko"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&po).unwrap(), first);
}

#[test]
fn batch_sync_writes_report_in_task_order() {
    let dir = project();
    let root = dir.path();
    bin_cmd(root)
        .args(["batch-sync", "--json-report", "out/report.json"])
        .assert()
        .success();

    let text = fs::read_to_string(root.join("report.txt")).unwrap();
    let order: Vec<usize> = [
        "sync data/events.xml:ko",
        "sync data/events.xml:ja",
        "sync misc:ko",
        "sync misc:ja",
    ]
    .iter()
    .map(|s| text.find(s).unwrap_or_else(|| panic!("missing section {s}")))
    .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));
    assert!(text.lines().last().unwrap().starts_with("TOTAL: tasks=4"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join("out/report.json")).unwrap()).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["tasks"].as_array().unwrap().len(), 4);
    assert_eq!(json["tasks"][0]["counts"]["added"], 2);
}

#[test]
fn corrupt_locale_fails_only_its_task() {
    let dir = project();
    let root = dir.path();
    write(
        &root.join("locale/misc/ko.po"),
        "msgctxt \"OK\"\nmsgid \"OK\"\nmsgstr \"broken\n",
    );

    bin_cmd(root)
        .args(["batch-sync", "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"partial-failure\""));

    let text = fs::read_to_string(root.join("report.txt")).unwrap();
    assert!(text.contains("parse-error"));
    assert!(root.join("locale/misc/ja.po").is_file());
}

#[test]
fn all_tasks_failing_exits_two() {
    let dir = project();
    let root = dir.path();
    write(
        &root.join("plan.toml"),
        "[[task]]\nresource = \"nope\"\nlanguage = \"ko\"\noperation = \"sync\"\n",
    );
    bin_cmd(root)
        .args(["batch-run", "--plan", "plan.toml"])
        .assert()
        .code(2);
    assert!(fs::read_to_string(root.join("report.txt"))
        .unwrap()
        .contains("io-error"));
}

#[test]
fn invalid_config_aborts_before_any_task() {
    let dir = project();
    let root = dir.path();
    bin_cmd(root)
        .args(["batch-sync", "--stale-threshold", "-1"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("stale_threshold"));
    assert!(!root.join("report.txt").exists());
    assert!(!root.join("locale").exists());
}

#[test]
fn export_refuses_with_errors_and_writes_when_clean() {
    let dir = project();
    let root = dir.path();
    write(
        &root.join("locale/misc/ko.po"),
        "msgctxt \"OK\"\nmsgid \"OK\"\nmsgstr \"\"\n",
    );
    bin_cmd(root)
        .args(["export", "misc:ko"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("empty-translation"));
    assert!(!root.join("output/ko/misc.json").exists());

    write(
        &root.join("locale/misc/ko.po"),
        "msgctxt \"OK\"\nmsgid \"OK\"\nmsgstr \"확인\"\n",
    );
    bin_cmd(root)
        .args(["export", "misc:ko", "--format", "xml"])
        .assert()
        .success();
    let xml = fs::read_to_string(root.join("output/ko/misc.xml")).unwrap();
    assert!(xml.contains("확인"));
}

#[test]
fn validate_never_writes() {
    let dir = project();
    let root = dir.path();
    bin_cmd(root)
        .args(["validate", "misc:ja", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing-entry"));
    assert!(!root.join("locale/misc/ja.po").exists());
}

#[test]
fn bad_target_is_a_usage_error() {
    let dir = project();
    bin_cmd(dir.path())
        .args(["sync", "no-language-here"])
        .assert()
        .code(3);
}

#[test]
fn schema_dumps_report_types() {
    let dir = tempfile::tempdir().unwrap();
    bin_cmd(dir.path())
        .args(["schema", "--out-dir", "schemas"])
        .assert()
        .success();
    let raw = fs::read_to_string(dir.path().join("schemas/batch_report.schema.json")).unwrap();
    let schema: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(schema["title"], "BatchReport");
}

#[test]
fn schema_write_failure_is_a_failed_run() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("blocker"), "");
    bin_cmd(dir.path())
        .args(["schema", "--out-dir", "blocker/schemas"])
        .assert()
        .code(2);
}

#[test]
fn source_language_target_is_a_usage_error() {
    let dir = project();
    bin_cmd(dir.path())
        .args(["sync", "misc:en"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("source language"));
    assert!(!dir.path().join("locale/misc/en.po").exists());
}

#[test]
fn merge_copies_translations_between_catalogs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        &root.join("old/ko.po"),
        "msgctxt \"misc$OK\"\nmsgid \"OK\"\nmsgstr \"확인\"\n\n\
         msgctxt \"misc$NO\"\nmsgid \"No\"\nmsgstr \"아니오\"\n",
    );
    write(
        &root.join("new/ko.po"),
        "#, missing\nmsgctxt \"misc$OK\"\nmsgid \"OK\"\nmsgstr \"\"\n",
    );

    bin_cmd(root)
        .args(["merge", "old/ko.po", "new/ko.po", "new/ko.po", "-c", "!o!e:!o:vf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 created, 1 overwritten"));
    let merged = fs::read_to_string(root.join("new/ko.po")).unwrap();
    assert!(merged.contains("확인") && merged.contains("아니오"));

    bin_cmd(root)
        .args(["merge", "old/ko.po", "new/ko.po", "out.po", "-c", "o:n:v"])
        .assert()
        .code(3);
    assert!(!root.join("out.po").exists());
}

#[test]
fn batch_sync_clean_removes_orphaned_locales() {
    let dir = project();
    let root = dir.path();
    write(
        &root.join("locale/data/retired.xml/ko.po"),
        "msgctxt \"X\"\nmsgid \"x\"\nmsgstr \"엑스\"\n",
    );
    bin_cmd(root).args(["batch-sync", "--clean"]).assert().success();
    assert!(!root.join("locale/data/retired.xml/ko.po").exists());
    assert!(root.join("locale/data/events.xml/ko.po").is_file());
}
