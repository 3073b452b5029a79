mod common;

use common::{RecordingStore, TestWorkspace, dataset_from_text, fixture_path};
use statsheet::{
    BackingStore, CellValue, ColumnType, DataType, Dataset, DatasetError, DatasetSchema,
    MISSING_INT, MeasureType, MemoryStore, Session,
    import::{CsvOptions, import_csv},
    settings::ImportSettings,
};

fn survey() -> Dataset {
    import_csv(
        &fixture_path("survey.csv"),
        &CsvOptions::default(),
        &ImportSettings::default(),
    )
    .expect("import survey")
}

#[test]
fn new_columns_and_rows_start_missing() {
    let mut dataset = Dataset::new();
    dataset.append_column("a");
    dataset.set_row_count(2);
    dataset.set_value(0, 0, 4).unwrap();
    dataset.insert_column(0, "b").unwrap();
    dataset.insert_rows(1, 2).unwrap();

    assert_eq!(dataset.headers(), vec!["b", "a"]);
    assert_eq!(dataset.row_count(), 4);
    assert_eq!(dataset.value(0, 1).unwrap(), CellValue::Int(4));
    assert_eq!(dataset.value(1, 1).unwrap(), CellValue::Int(MISSING_INT));
    assert_eq!(dataset.value(3, 0).unwrap(), CellValue::Int(MISSING_INT));
    dataset.validate_invariants().expect("invariants");
}

#[test]
fn column_ids_are_never_reused() {
    let mut dataset = Dataset::new();
    let first = dataset.append_column("a").id();
    dataset.append_column("b");
    let removed = dataset.delete_columns(0, 1).unwrap();
    assert_eq!(removed.len(), 2);
    let next = dataset.append_column("c").id();
    assert!(next > first + 1);
    assert_eq!(dataset.column_by_id(next).unwrap().index(), 0);
}

#[test]
fn out_of_range_edits_are_rejected() {
    let mut dataset = dataset_from_text("a\n1\n2\n");
    assert!(matches!(
        dataset.delete_rows(1, 5),
        Err(DatasetError::RowOutOfRange { row: 5, .. })
    ));
    assert!(matches!(
        dataset.delete_rows(1, 0),
        Err(DatasetError::InvalidRange { .. })
    ));
    assert!(matches!(
        dataset.insert_column(3, "z"),
        Err(DatasetError::ColumnOutOfRange { index: 3, .. })
    ));
    assert!(matches!(dataset.column_by_name("z"), Err(DatasetError::ColumnNotFound(_))));
}

#[test]
fn deleting_rows_drops_levels_nobody_uses() {
    let mut dataset = dataset_from_text("g\na\nb\nc\n");
    dataset.delete_rows(1, 1).unwrap();
    let column = dataset.column(0).unwrap();
    let levels: Vec<(i32, &str)> = column
        .levels()
        .iter()
        .map(|l| (l.value, l.label.as_str()))
        .collect();
    assert_eq!(levels, vec![(0, "a"), (2, "c")]);
    assert_eq!(column.value(1).unwrap(), CellValue::Text("c".into()));
    dataset.validate_invariants().expect("invariants");
}

#[test]
fn shrinking_and_growing_rows() {
    let mut dataset = survey();
    dataset.set_row_count(2);
    dataset.append_rows(1);
    let score = dataset.column_by_name("score").unwrap();
    assert_eq!(score.value(0).unwrap(), CellValue::Float(12.5));
    assert!(score.should_treat_as_missing(2).unwrap());
    dataset.validate_invariants().expect("invariants");
}

#[test]
fn schema_survives_a_yaml_round_trip() {
    let workspace = TestWorkspace::new();
    let path = workspace.path().join("survey.schema.yml");

    let mut edited = survey();
    {
        let rating = edited.column_by_name_mut("rating").unwrap();
        rating.change(None, Some(MeasureType::Ordinal));
        rating.set_description("Self-reported rating");
    }
    edited
        .column_by_name_mut("score")
        .unwrap()
        .change(Some(DataType::Integer), None);
    edited.schema().save(&path).expect("save schema");

    let loaded = DatasetSchema::load(&path).expect("load schema");
    assert_eq!(loaded, edited.schema());
    assert!(loaded.to_yaml_string().unwrap().contains("measure_type: ordinal"));

    let mut fresh = survey();
    assert_eq!(fresh.apply_schema(&loaded).unwrap(), 6);
    let rating = fresh.column_by_name("rating").unwrap();
    assert_eq!(rating.measure_type(), MeasureType::Ordinal);
    assert_eq!(rating.description(), "Self-reported rating");
    let score = fresh.column_by_name("score").unwrap();
    assert_eq!(score.data_type(), DataType::Integer);
    assert_eq!(score.value(0).unwrap(), CellValue::Int(13));
    assert_eq!(
        fresh.column_by_name("comment").unwrap().missing_values().to_strings(),
        vec!["== \"NA\""]
    );
    fresh.validate_invariants().expect("invariants");
}

#[test]
fn session_mirrors_an_import_into_the_store() {
    let dataset = survey();
    let mut session = Session::from_dataset(dataset, MemoryStore::new(), 4).unwrap();
    assert!(session.buffer().commit_count() > 0);
    session.commit().unwrap();

    let handle = session.handle();
    let city = session.store_column(4).unwrap();
    assert_eq!(session.store().row_count(handle).unwrap(), 5);
    assert_eq!(
        session.store().value(handle, 3, city).unwrap(),
        Some(CellValue::Text("Tromso".into()))
    );

    session.delete_rows(0, 1).unwrap();
    session.commit().unwrap();
    assert_eq!(session.store().row_count(handle).unwrap(), 3);
    assert_eq!(
        session.store().value(handle, 1, city).unwrap(),
        Some(CellValue::Text("Tromso".into()))
    );

    let (dataset, store) = session.close().unwrap();
    assert_eq!(dataset.row_count(), 3);
    assert!(store.is_closed());
}

#[test]
fn session_structural_edits_commit_first() {
    let mut session = Session::create(MemoryStore::new(), 16).unwrap();
    session.append_column("a").unwrap();
    session.set_row_count(3).unwrap();
    session.set_value(2, 0, 9).unwrap();
    assert!(!session.buffer().is_empty());

    session.insert_column(0, "b").unwrap();
    assert_eq!(session.buffer().commit_count(), 1);

    session.commit().unwrap();
    let handle = session.handle();
    let a = session.store_column(1).unwrap();
    assert_eq!(
        session.store().value(handle, 2, a).unwrap(),
        Some(CellValue::Int(9))
    );

    session.delete_columns(1, 1).unwrap();
    assert!(session.store().value(handle, 2, a).is_err());
    assert_eq!(session.dataset().headers(), vec!["b"]);
}

#[test]
fn failed_auto_commit_leaves_the_edit_unapplied() {
    let store = RecordingStore::default();
    let fail_next = store.fail_next.clone();
    let mut session = Session::create(store, 1).unwrap();
    session.append_column("a").unwrap();
    session.set_row_count(2).unwrap();
    session.commit().unwrap();
    session.set_value(0, 0, 5).unwrap();

    fail_next.set(true);
    assert!(matches!(
        session.set_value(1, 0, 7),
        Err(DatasetError::Store(_))
    ));
    assert_eq!(session.dataset().value(1, 0).unwrap(), CellValue::Int(MISSING_INT));
    assert_eq!(session.buffer().pending().len(), 1);
    assert_eq!(session.buffer().pending()[0].row, 0);

    session.set_value(1, 0, 7).unwrap();
    session.commit().unwrap();
    let handle = session.handle();
    let a = session.store_column(0).unwrap();
    assert_eq!(session.store().value(handle, 0, a).unwrap(), Some(CellValue::Int(5)));
    assert_eq!(session.store().value(handle, 1, a).unwrap(), Some(CellValue::Int(7)));
}

#[test]
fn filter_columns_hide_rows() {
    let mut dataset = dataset_from_text("score,keep\n1,1\n2,0\n3,1\n4,\n");
    assert!(!dataset.has_filters());
    assert_eq!(dataset.row_count_ex_filtered(), 4);

    dataset
        .column_mut(1)
        .unwrap()
        .set_column_type(ColumnType::Filter);
    dataset.refresh_filter_state();
    assert!(dataset.has_filters());
    assert!(!dataset.is_row_filtered(0).unwrap());
    assert!(dataset.is_row_filtered(1).unwrap());
    assert!(dataset.is_row_filtered(3).unwrap());
    assert_eq!(dataset.row_count_ex_filtered(), 2);
    assert_eq!(dataset.get_index_ex_filtered(1).unwrap(), 2);
    assert_eq!(dataset.get_indices_ex_filtered(0, 2).unwrap(), vec![0, 2]);
    assert!(matches!(
        dataset.get_index_ex_filtered(2),
        Err(DatasetError::RowOutOfRange { row: 2, row_count: 2 })
    ));

    dataset.set_value(1, 1, 1).unwrap();
    assert_eq!(dataset.get_indices_ex_filtered(0, 3).unwrap(), vec![0, 1, 2]);

    dataset.column_mut(1).unwrap().set_active(false);
    dataset.refresh_filter_state();
    assert_eq!(dataset.row_count_ex_filtered(), 4);

    dataset.column_mut(1).unwrap().set_active(true);
    dataset.delete_columns(1, 1).unwrap();
    assert_eq!(dataset.row_count_ex_filtered(), 4);
    assert!(matches!(
        dataset.is_row_filtered(4),
        Err(DatasetError::RowOutOfRange { row: 4, .. })
    ));
}

#[test]
fn filtered_rows_track_row_edits() {
    let mut dataset = dataset_from_text("keep\n0\n1\n");
    dataset
        .column_mut(0)
        .unwrap()
        .set_column_type(ColumnType::Filter);
    dataset.refresh_filter_state();
    assert_eq!(dataset.get_indices_ex_filtered(0, 1).unwrap(), vec![1]);

    dataset.insert_rows(0, 0).unwrap();
    assert!(dataset.is_row_filtered(0).unwrap());
    assert_eq!(dataset.get_indices_ex_filtered(0, 1).unwrap(), vec![2]);

    dataset.delete_rows(2, 2).unwrap();
    assert_eq!(dataset.row_count_ex_filtered(), 0);
}

#[test]
fn weights_and_formulas_survive_the_schema() {
    let mut dataset = dataset_from_text("w,x\n1,2\n3,4\n");
    let w = dataset.column(0).unwrap().id();
    assert!(matches!(
        dataset.set_weights(Some(99)),
        Err(DatasetError::ColumnNotFound(_))
    ));
    dataset.set_weights(Some(w)).unwrap();
    {
        let x = dataset.column_mut(1).unwrap();
        x.set_formula("w * 2");
        x.set_formula_message("stale");
        x.set_active(false);
    }

    let schema = dataset.schema();
    assert_eq!(schema.weights.as_deref(), Some("w"));
    let yaml = schema.to_yaml_string().unwrap();
    assert!(yaml.contains("formula:"));
    assert!(yaml.contains("active: false"));
    assert_eq!(yaml.matches("active:").count(), 1);

    let mut fresh = dataset_from_text("w,x\n1,2\n3,4\n");
    fresh.apply_schema(&schema).unwrap();
    assert_eq!(fresh.weights(), Some(fresh.column(0).unwrap().id()));
    let x = fresh.column(1).unwrap();
    assert_eq!(x.formula(), "w * 2");
    assert_eq!(x.formula_message(), "stale");
    assert!(!x.active());

    dataset.delete_columns(0, 0).unwrap();
    assert_eq!(dataset.weights(), None);
}
