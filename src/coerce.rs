use std::collections::BTreeSet;

use itertools::Itertools;
use log::debug;

use crate::{
    column::{Cells, Column},
    levels::{Level, LevelTable},
    value::{
        DataType, MISSING_INT, MeasureType, float_to_int, float_to_text, int_to_float,
        int_to_text, parse_finite_f64, parse_i32, text_to_float, text_to_int,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeOutcome {
    pub data_type: DataType,
    pub measure_type: MeasureType,
    pub adjusted: bool,
    pub values_changed: bool,
    pub levels_changed: bool,
}

impl ChangeOutcome {
    pub fn changed(&self) -> bool {
        self.values_changed || self.levels_changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelOrder {
    Lexical,
    Numeric,
}

impl Column {
    /// Moves the column to a new data type and/or measure type. Omitted
    /// dimensions keep their current value. Never fails: an incompatible
    /// request is resolved to the nearest compatible pair.
    pub fn change(
        &mut self,
        data_type: Option<DataType>,
        measure_type: Option<MeasureType>,
    ) -> ChangeOutcome {
        let old_data_type = self.data_type();
        let old_measure_type = self.measure_type;
        let previous_levels = self.levels.clone();

        let requested_data_type = data_type.unwrap_or(old_data_type);
        let requested_measure_type = measure_type.unwrap_or(old_measure_type);

        let (new_data_type, new_measure_type) =
            if requested_measure_type.is_compatible_with(requested_data_type) {
                (requested_data_type, requested_measure_type)
            } else if data_type.is_none() {
                let promoted = self.promoted_data_type(requested_measure_type);
                if requested_measure_type.is_compatible_with(promoted) {
                    (promoted, requested_measure_type)
                } else {
                    (promoted, promoted.canonical_measure_type())
                }
            } else {
                (
                    requested_data_type,
                    requested_data_type.canonical_measure_type(),
                )
            };

        if measure_type.is_some() && new_measure_type != requested_measure_type {
            debug!(
                "Column '{}': {requested_measure_type} does not fit {new_data_type}, using {new_measure_type}",
                self.name
            );
        }

        let values_changed = new_data_type != old_data_type;
        if values_changed {
            self.cells = self.converted_cells(new_data_type);
            self.determine_dps();
        }
        self.measure_type = new_measure_type;

        if !new_measure_type.is_categorical() {
            self.levels.clear();
        } else if !old_measure_type.is_categorical() || values_changed {
            let order = if old_data_type == DataType::Decimal {
                LevelOrder::Numeric
            } else {
                LevelOrder::Lexical
            };
            self.rebuild_levels_from(&previous_levels, order);
        }

        let outcome = ChangeOutcome {
            data_type: new_data_type,
            measure_type: new_measure_type,
            adjusted: new_data_type != requested_data_type
                || new_measure_type != requested_measure_type,
            values_changed,
            levels_changed: self.levels != previous_levels,
        };
        if outcome.changed() || new_measure_type != old_measure_type {
            debug!(
                "Column '{}' changed from {}/{} to {}/{}",
                self.name, old_data_type, old_measure_type, new_data_type, new_measure_type
            );
        }
        outcome
    }

    fn promoted_data_type(&self, measure_type: MeasureType) -> DataType {
        match (&self.cells, measure_type.is_categorical()) {
            (Cells::Decimal(_), true) => DataType::Text,
            (Cells::Text(values), false) => {
                let all_integers = values
                    .iter()
                    .filter(|v| !v.is_empty())
                    .all(|v| parse_i32(v).is_some());
                if all_integers {
                    DataType::Integer
                } else {
                    DataType::Decimal
                }
            }
            _ => self.data_type(),
        }
    }

    fn converted_cells(&self, target: DataType) -> Cells {
        let labelled = self.measure_type.is_categorical();
        match (&self.cells, target) {
            (Cells::Integer(values), DataType::Integer) => Cells::Integer(values.clone()),
            (Cells::Integer(values), DataType::Decimal) => {
                Cells::Decimal(values.iter().map(|v| int_to_float(*v)).collect())
            }
            (Cells::Integer(values), DataType::Text) => Cells::Text(
                values
                    .iter()
                    .map(|v| match self.levels.label_for(*v) {
                        Some(label) if labelled && *v != MISSING_INT => label.to_string(),
                        _ => int_to_text(*v),
                    })
                    .collect(),
            ),
            (Cells::Decimal(values), DataType::Integer) => {
                Cells::Integer(values.iter().map(|v| float_to_int(*v)).collect())
            }
            (Cells::Decimal(values), DataType::Decimal) => Cells::Decimal(values.clone()),
            (Cells::Decimal(values), DataType::Text) => Cells::Text(
                values
                    .iter()
                    .map(|v| float_to_text(*v, Some(self.dps)))
                    .collect(),
            ),
            (Cells::Text(values), DataType::Integer) => {
                Cells::Integer(values.iter().map(|v| text_to_int(v)).collect())
            }
            (Cells::Text(values), DataType::Decimal) => {
                Cells::Decimal(values.iter().map(|v| text_to_float(v)).collect())
            }
            (Cells::Text(values), DataType::Text) => Cells::Text(values.clone()),
        }
    }

    pub(crate) fn rebuild_levels(&mut self) {
        let previous = self.levels.clone();
        self.rebuild_levels_from(&previous, LevelOrder::Lexical);
    }

    fn rebuild_levels_from(&mut self, previous: &LevelTable, order: LevelOrder) {
        if !self.measure_type.is_categorical() {
            self.levels.clear();
            return;
        }
        let carry = |level: Level| match previous.by_label(&level.label) {
            Some(old) => level
                .with_import_value(old.import_value.clone())
                .pinned(old.pinned),
            None => level,
        };
        let levels: Vec<Level> = match &self.cells {
            Cells::Integer(values) => values
                .iter()
                .copied()
                .filter(|v| *v != MISSING_INT)
                .collect::<BTreeSet<i32>>()
                .into_iter()
                .map(|v| carry(Level::new(v, v.to_string())))
                .collect(),
            Cells::Text(values) => {
                let distinct = values.iter().filter(|v| !v.is_empty()).unique();
                let sorted: Vec<&String> = match order {
                    LevelOrder::Lexical => distinct.sorted().collect(),
                    LevelOrder::Numeric => distinct
                        .sorted_by(|a, b| {
                            let a = parse_finite_f64(a).unwrap_or(f64::INFINITY);
                            let b = parse_finite_f64(b).unwrap_or(f64::INFINITY);
                            a.total_cmp(&b)
                        })
                        .collect(),
                };
                sorted
                    .into_iter()
                    .zip(0..)
                    .map(|(label, code)| carry(Level::new(code, label.clone())))
                    .collect()
            }
            Cells::Decimal(_) => Vec::new(),
        };
        self.levels = LevelTable::from_levels(levels);
    }
}
