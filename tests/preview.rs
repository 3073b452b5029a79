mod common;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::{prelude::PredicateBooleanExt, str::contains};

#[test]
fn preview_shows_typed_values() {
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args(["preview", "-i", fixture_path("survey.csv").to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("id"))
        .stdout(contains("12.50"))
        .stdout(contains("Tromso"));
}

#[test]
fn preview_limits_rows() {
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args([
            "preview",
            "-i",
            fixture_path("survey.csv").to_str().unwrap(),
            "--rows",
            "2",
        ])
        .assert()
        .success()
        .stdout(contains("treatment"))
        .stdout(contains("Tromso").not());
}

#[test]
fn preview_applies_a_saved_schema() {
    let workspace = TestWorkspace::new();
    let meta = workspace.write(
        "schema.yml",
        "columns:\n  - name: score\n    data_type: integer\n    measure_type: continuous\n",
    );
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args([
            "preview",
            "-i",
            fixture_path("survey.csv").to_str().unwrap(),
            "-m",
            meta.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("13"))
        .stdout(contains("12.50").not());
}

#[test]
fn preview_hides_rows_a_filter_column_excludes() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", "name,keep\nann,1\nbob,0\ncid,1\n");
    let meta = workspace.write(
        "schema.yml",
        "columns:\n  - name: keep\n    column_type: filter\n    data_type: integer\n    measure_type: nominal\n",
    );
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args([
            "preview",
            "-i",
            input.to_str().unwrap(),
            "-m",
            meta.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("ann"))
        .stdout(contains("cid"))
        .stdout(contains("bob").not());
}
