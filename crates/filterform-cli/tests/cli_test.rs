//! CLI behavior tests for the filterform binary.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SAMPLE: &str = r#"{"filterGroup":{"children":[
  {"columnName":"name","id":"f-1","kind":"field","location":"LOCATION_TYPE_EXPERIMENT","operator":"contains","type":"COLUMN_TYPE_TEXT","value":"resnet"},
  {"columnName":"loss","id":"f-2","kind":"field","location":"LOCATION_TYPE_VALIDATIONS","operator":"<=","type":"COLUMN_TYPE_NUMBER","value":null}
],"conjunction":"and","id":"ROOT","kind":"group"},"showArchived":false}"#;

fn write_doc(tmp: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = tmp.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn filterform() -> Command {
    Command::cargo_bin("filterform").expect("binary should build")
}

#[test]
fn test_validate_accepts_well_formed_document() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "filter.json", SAMPLE);

    filterform()
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid: 2 condition(s) (1 complete)"));
}

#[test]
fn test_validate_rejects_malformed_json() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "broken.json", "{oops");

    filterform()
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid filter document"));
}

#[test]
fn test_validate_rejects_duplicate_ids() {
    let tmp = TempDir::new().unwrap();
    let dup = r#"{"filterGroup":{"children":[
  {"columnName":"name","id":"x","kind":"field","location":"LOCATION_TYPE_EXPERIMENT","operator":"contains","type":"COLUMN_TYPE_TEXT","value":"a"},
  {"columnName":"name","id":"x","kind":"field","location":"LOCATION_TYPE_EXPERIMENT","operator":"contains","type":"COLUMN_TYPE_TEXT","value":"b"}
],"conjunction":"and","id":"ROOT","kind":"group"},"showArchived":false}"#;
    let file = write_doc(&tmp, "dup.json", dup);

    filterform()
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate node id"));
}

#[test]
fn test_validate_rejects_excessive_nesting() {
    let tmp = TempDir::new().unwrap();
    let deep = r#"{"filterGroup":{"children":[
  {"children":[
    {"children":[
      {"children":[],"conjunction":"and","id":"g-3","kind":"group"}
    ],"conjunction":"and","id":"g-2","kind":"group"}
  ],"conjunction":"and","id":"g-1","kind":"group"}
],"conjunction":"and","id":"ROOT","kind":"group"},"showArchived":false}"#;
    let file = write_doc(&tmp, "deep.json", deep);

    filterform()
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nesting too deep"));
}

#[test]
fn test_validate_missing_file_fails() {
    filterform()
        .arg("validate")
        .arg("does-not-exist.json")
        .assert()
        .failure();
}

#[test]
fn test_show_lists_conditions() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "filter.json", SAMPLE);

    filterform()
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Filter: 2 condition(s)"))
        .stdout(predicate::str::contains("name contains resnet"))
        .stdout(predicate::str::contains("Operator"));
}

#[test]
fn test_sanitize_strips_ids_and_incomplete_conditions() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "filter.json", SAMPLE);

    filterform()
        .arg("sanitize")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\":\"resnet\""))
        .stdout(predicate::str::contains("\"id\"").not())
        .stdout(predicate::str::contains("loss").not());
}

#[test]
fn test_sanitize_writes_output_file() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "filter.json", SAMPLE);
    let out = tmp.path().join("query.json");

    filterform()
        .arg("sanitize")
        .arg(&file)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("resnet"));
    assert!(!written.contains("\"id\""));
}
