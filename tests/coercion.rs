mod common;

use common::dataset_from_text;
use proptest::prelude::*;
use statsheet::{
    CellValue, Column, DataType, Level, MeasureType, inference::infer_dataset,
    settings::ImportSettings,
};

fn single_column(values: &[String]) -> Column {
    let header = vec!["x".to_string()];
    let rows: Vec<Vec<String>> = values.iter().map(|v| vec![v.clone()]).collect();
    let dataset = infer_dataset(&header, &rows, &ImportSettings::default()).expect("infer");
    dataset.column(0).expect("column").clone()
}

type Snapshot = (DataType, MeasureType, u8, Vec<Level>, Vec<String>);

fn snapshot(column: &Column) -> Snapshot {
    (
        column.data_type(),
        column.measure_type(),
        column.dps(),
        column.levels().as_slice().to_vec(),
        column.values().map(|v| format!("{v:?}")).collect(),
    )
}

fn assert_invariants(column: &Column) {
    column.validate_invariants().expect("column invariants");
    assert!(!matches!(
        (column.data_type(), column.measure_type()),
        (DataType::Decimal, MeasureType::Nominal | MeasureType::Ordinal)
    ));
    if !column.measure_type().is_categorical() {
        assert!(!column.has_levels());
    }
}

#[test]
fn text_nominal_to_decimal() {
    let mut column = single_column(&["123.12".to_string(), "fred".to_string()]);
    assert_eq!(column.data_type(), DataType::Text);
    assert_eq!(column.measure_type(), MeasureType::Nominal);

    column.change(Some(DataType::Decimal), None);

    assert_eq!(column.value(0).unwrap(), CellValue::Float(123.12));
    assert!(matches!(column.value(1).unwrap(), CellValue::Float(v) if v.is_nan()));
    assert_eq!(column.measure_type(), MeasureType::Continuous);
    assert_eq!(column.dps(), 2);
    assert!(!column.has_levels());
}

#[test]
fn decimal_continuous_to_ordinal_becomes_text() {
    let dataset = dataset_from_text("w\n2.5\n10.25\n2.5\n");
    let mut column = dataset.column(0).unwrap().clone();
    assert_eq!(column.data_type(), DataType::Decimal);
    assert_eq!(column.measure_type(), MeasureType::Continuous);

    let outcome = column.change(None, Some(MeasureType::Ordinal));

    assert_eq!(outcome.data_type, DataType::Text);
    assert_eq!(column.measure_type(), MeasureType::Ordinal);
    let labels: Vec<&str> = column.levels().iter().map(|l| l.label.as_str()).collect();
    assert_eq!(labels, vec!["2.50", "10.25"]);
    assert_eq!(column.level_code_at(1).unwrap(), Some(1));
    assert_invariants(&column);
}

#[test]
fn integer_nominal_to_continuous_and_back() {
    let dataset = dataset_from_text("n\n3\n1\n3\n");
    let mut column = dataset.column(0).unwrap().clone();
    column.change(None, Some(MeasureType::Continuous));
    assert!(!column.has_levels());
    assert_eq!(column.data_type(), DataType::Integer);

    column.change(None, Some(MeasureType::Nominal));
    let values: Vec<i32> = column.levels().iter().map(|l| l.value).collect();
    assert_eq!(values, vec![1, 3]);
}

#[test]
fn id_columns_drop_levels() {
    let dataset = dataset_from_text("g\na\nb\n");
    let mut column = dataset.column(0).unwrap().clone();
    column.change(None, Some(MeasureType::Id));
    assert_eq!(column.data_type(), DataType::Text);
    assert!(!column.has_levels());
    assert_eq!(column.value(1).unwrap(), CellValue::Text("b".into()));
}

fn cell_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-d]{1,2}",
        "-?[0-9]{1,3}",
        "-?[0-9]{1,2}\\.[0-9]{1,3}",
        Just(String::new()),
        Just("NA".to_string()),
    ]
}

fn data_type() -> impl Strategy<Value = Option<DataType>> {
    prop_oneof![
        Just(None),
        Just(Some(DataType::Integer)),
        Just(Some(DataType::Decimal)),
        Just(Some(DataType::Text)),
    ]
}

fn measure_type() -> impl Strategy<Value = Option<MeasureType>> {
    prop_oneof![
        Just(None),
        Just(Some(MeasureType::Nominal)),
        Just(Some(MeasureType::Ordinal)),
        Just(Some(MeasureType::Continuous)),
        Just(Some(MeasureType::Id)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn invariants_hold_across_change_sequences(
        values in prop::collection::vec(cell_literal(), 0..12),
        changes in prop::collection::vec((data_type(), measure_type()), 1..8),
    ) {
        let mut column = single_column(&values);
        assert_invariants(&column);
        for (data_type, measure_type) in changes {
            let outcome = column.change(data_type, measure_type);
            prop_assert_eq!(outcome.data_type, column.data_type());
            prop_assert_eq!(outcome.measure_type, column.measure_type());
            assert_invariants(&column);
        }
    }

    #[test]
    fn change_is_idempotent(
        values in prop::collection::vec(cell_literal(), 0..12),
        setup in (data_type(), measure_type()),
        target in (data_type(), measure_type()),
    ) {
        let mut column = single_column(&values);
        column.change(setup.0, setup.1);

        column.change(target.0, target.1);
        let once = snapshot(&column);
        let second = column.change(target.0, target.1);
        prop_assert_eq!(snapshot(&column), once);
        prop_assert!(!second.values_changed);
    }
}
