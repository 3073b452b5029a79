mod common;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::{prelude::PredicateBooleanExt, str::contains};
use statsheet::{BackingStore, CellValue, ColumnId, DatasetHandle, JournalStore};

#[test]
fn import_into_memory_store() {
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args(["import", "-i", fixture_path("survey.csv").to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains(
            "Imported 5 row(s) x 6 column(s) into the memory store in 1 commit(s)",
        ));
}

#[test]
fn small_buffers_commit_more_often() {
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args([
            "import",
            "-i",
            fixture_path("survey.csv").to_str().unwrap(),
            "--buffer-size",
            "4",
        ])
        .assert()
        .success()
        .stdout(contains("in 8 commit(s)"));
}

#[test]
fn import_into_journal_store_can_be_replayed() {
    let workspace = TestWorkspace::new();
    let journal = workspace.path().join("survey.journal");
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args([
            "import",
            "-i",
            fixture_path("survey.csv").to_str().unwrap(),
            "--store",
            "journal",
            "--journal",
            journal.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("journal store"));

    let store = JournalStore::open(&journal).expect("replay journal");
    let handle = DatasetHandle(0);
    assert_eq!(store.datasets(), vec![handle]);
    assert_eq!(store.row_count(handle).unwrap(), 5);
    assert_eq!(
        store.column_names(handle).unwrap(),
        vec!["id", "group", "score", "rating", "city", "comment"]
    );
    let city = ColumnId(4);
    assert_eq!(
        store.value(handle, 0, city).unwrap(),
        Some(CellValue::Text("Oslo".into()))
    );
}

#[test]
fn settings_file_supplies_store_and_locale() {
    let workspace = TestWorkspace::new();
    let journal = workspace.path().join("weights.journal");
    let config = workspace.write(
        "settings.yml",
        &format!(
            "import:\n  decimal_symbol: \",\"\nwrite_buffer:\n  max_items: 2\nstore:\n  kind: journal\n  path: {}\n",
            journal.display()
        ),
    );
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args([
            "import",
            "-i",
            fixture_path("decimal_comma.csv").to_str().unwrap(),
            "--delimiter",
            ";",
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("3 row(s) x 2 column(s) into the journal store in 3 commit(s)"));

    let store = JournalStore::open(&journal).expect("replay journal");
    assert_eq!(
        store.value(DatasetHandle(0), 1, ColumnId(1)).unwrap(),
        Some(CellValue::Float(2.75))
    );
}

#[test]
fn journal_store_without_a_path_fails() {
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args([
            "import",
            "-i",
            fixture_path("survey.csv").to_str().unwrap(),
            "--store",
            "journal",
        ])
        .assert()
        .failure()
        .stderr(contains("journal store requires a path"));
}

#[test]
fn invalid_settings_are_rejected() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("settings.yml", "write_buffer:\n  max_items: 0\n");
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args([
            "import",
            "-i",
            fixture_path("survey.csv").to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("max_items must be at least 1"));
}

#[test]
fn bad_delimiter_is_a_usage_error() {
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args([
            "inspect",
            "-i",
            fixture_path("survey.csv").to_str().unwrap(),
            "--delimiter",
            "ab",
        ])
        .assert()
        .failure()
        .stderr(contains("single character"));
}

#[test]
fn import_warns_once_about_undecodable_bytes() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_bytes("latin.csv", b"name\ncaf\xe9\nna\xefve\nx\n");
    Command::cargo_bin("statsheet")
        .expect("binary exists")
        .args(["import", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Imported 3 row(s) x 1 column(s)"))
        .stderr(contains("2 record(s)").and(contains("replaced with U+FFFD")));
}
