use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn lint() -> Command {
    Command::cargo_bin("sheetbind-lint").expect("binary builds")
}

#[test]
fn valid_manifest_passes() {
    lint()
        .arg("tests/fixtures/people.yaml")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok (6 columns)"));
}

#[test]
fn invalid_manifest_fails_with_issue_paths() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("tempfile");
    write!(
        file,
        r#"{{
            "spec": "sheetbind",
            "spec_version": "0.2.0",
            "manifest": {{ "id": "dup-keys", "name": "Dup" }},
            "columns": [
                {{ "key": "a", "col": "A" }},
                {{ "key": "a", "col": "B" }}
            ]
        }}"#
    )
    .expect("write manifest");

    lint()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("columns[1].key"))
        .stderr(predicate::str::contains("duplicate column key `a`"));
}

#[test]
fn unreadable_file_is_reported() {
    lint()
        .arg("tests/fixtures/does-not-exist.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn schema_flag_prints_json_schema() {
    lint()
        .arg("--schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"columns\""));
}
