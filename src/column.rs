//! Columns: typed cell storage plus the metadata the data editor shows.
//!
//! A column's data type is the variant of its [`Cells`], so a stored cell
//! can never disagree with the column's declared storage. Levels annotate
//! NOMINAL and ORDINAL columns: for INTEGER storage the level value is the
//! stored code, for TEXT storage the level label is the stored literal.

use std::collections::HashSet;

use crate::{
    error::{DatasetError, Result},
    levels::{Level, LevelTable},
    missing::MissingValues,
    numeric::calc_dps,
    value::{CellValue, ColumnType, DataType, MISSING_INT, MeasureType, parse_finite_f64},
};

const DEFAULT_WIDTH: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum Cells {
    Integer(Vec<i32>),
    Decimal(Vec<f64>),
    Text(Vec<String>),
}

impl Cells {
    pub fn missing(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::Integer => Cells::Integer(vec![MISSING_INT; len]),
            DataType::Decimal => Cells::Decimal(vec![f64::NAN; len]),
            DataType::Text => Cells::Text(vec![String::new(); len]),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Cells::Integer(_) => DataType::Integer,
            Cells::Decimal(_) => DataType::Decimal,
            Cells::Text(_) => DataType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Cells::Integer(values) => values.len(),
            Cells::Decimal(values) => values.len(),
            Cells::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize) -> Option<CellValue> {
        match self {
            Cells::Integer(values) => values.get(row).map(|v| CellValue::Int(*v)),
            Cells::Decimal(values) => values.get(row).map(|v| CellValue::Float(*v)),
            Cells::Text(values) => values.get(row).map(|v| CellValue::Text(v.clone())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = CellValue> + '_ {
        (0..self.len()).filter_map(move |row| self.get(row))
    }

    pub(crate) fn set(&mut self, row: usize, value: &CellValue) {
        match self {
            Cells::Integer(values) => values[row] = native_int(value),
            Cells::Decimal(values) => values[row] = native_float(value),
            Cells::Text(values) => values[row] = native_text(value),
        }
    }

    pub(crate) fn resize(&mut self, len: usize) {
        match self {
            Cells::Integer(values) => values.resize(len, MISSING_INT),
            Cells::Decimal(values) => values.resize(len, f64::NAN),
            Cells::Text(values) => values.resize(len, String::new()),
        }
    }

    pub(crate) fn insert_missing(&mut self, at: usize, count: usize) {
        match self {
            Cells::Integer(values) => {
                values.splice(at..at, std::iter::repeat_n(MISSING_INT, count));
            }
            Cells::Decimal(values) => {
                values.splice(at..at, std::iter::repeat_n(f64::NAN, count));
            }
            Cells::Text(values) => {
                values.splice(at..at, std::iter::repeat_n(String::new(), count));
            }
        }
    }

    pub(crate) fn remove_range(&mut self, start: usize, end_inclusive: usize) {
        match self {
            Cells::Integer(values) => {
                values.drain(start..=end_inclusive);
            }
            Cells::Decimal(values) => {
                values.drain(start..=end_inclusive);
            }
            Cells::Text(values) => {
                values.drain(start..=end_inclusive);
            }
        }
    }
}

fn native_int(value: &CellValue) -> i32 {
    match value.convert_to(DataType::Integer) {
        CellValue::Int(v) => v,
        _ => MISSING_INT,
    }
}

fn native_float(value: &CellValue) -> f64 {
    match value.convert_to(DataType::Decimal) {
        CellValue::Float(v) => v,
        _ => f64::NAN,
    }
}

fn native_text(value: &CellValue) -> String {
    match value.convert_to(DataType::Text) {
        CellValue::Text(v) => v,
        _ => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FValue<'a> {
    Missing,
    Level(&'a Level),
    Value(CellValue),
}

#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) id: i32,
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) import_name: String,
    pub(crate) description: String,
    pub(crate) column_type: ColumnType,
    pub(crate) measure_type: MeasureType,
    pub(crate) dps: u8,
    pub(crate) width: u32,
    pub(crate) auto_measure: bool,
    pub(crate) trim_levels: bool,
    pub(crate) active: bool,
    pub(crate) formula: String,
    pub(crate) formula_message: String,
    pub(crate) missing_values: MissingValues,
    pub(crate) levels: LevelTable,
    pub(crate) cells: Cells,
}

impl Column {
    pub(crate) fn with_rows(
        id: i32,
        name: impl Into<String>,
        import_name: impl Into<String>,
        row_count: usize,
    ) -> Self {
        Self {
            id,
            index: 0,
            name: name.into(),
            import_name: import_name.into(),
            description: String::new(),
            column_type: ColumnType::Data,
            measure_type: MeasureType::Nominal,
            dps: 0,
            width: DEFAULT_WIDTH,
            auto_measure: true,
            trim_levels: true,
            active: true,
            formula: String::new(),
            formula_message: String::new(),
            missing_values: MissingValues::new(),
            levels: LevelTable::new(),
            cells: Cells::missing(DataType::Integer, row_count),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn import_name(&self) -> &str {
        &self.import_name
    }

    pub fn set_import_name(&mut self, import_name: impl Into<String>) {
        self.import_name = import_name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn set_column_type(&mut self, column_type: ColumnType) {
        self.column_type = column_type;
    }

    pub fn data_type(&self) -> DataType {
        self.cells.data_type()
    }

    pub fn measure_type(&self) -> MeasureType {
        self.measure_type
    }

    pub fn dps(&self) -> u8 {
        self.dps
    }

    pub fn set_dps(&mut self, dps: u8) {
        self.dps = dps.min(crate::numeric::MAX_DPS);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    pub fn auto_measure(&self) -> bool {
        self.auto_measure
    }

    pub fn set_auto_measure(&mut self, auto_measure: bool) {
        self.auto_measure = auto_measure;
    }

    pub fn trim_levels(&self) -> bool {
        self.trim_levels
    }

    pub fn set_trim_levels(&mut self, trim_levels: bool) {
        self.trim_levels = trim_levels;
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn set_formula(&mut self, formula: impl Into<String>) {
        self.formula = formula.into();
    }

    pub fn formula_message(&self) -> &str {
        &self.formula_message
    }

    pub fn set_formula_message(&mut self, message: impl Into<String>) {
        self.formula_message = message.into();
    }

    pub fn missing_values(&self) -> &MissingValues {
        &self.missing_values
    }

    pub fn set_missing_values<I, S>(&mut self, rules: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.missing_values = MissingValues::parse(rules)?;
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &Cells {
        &self.cells
    }

    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    pub fn has_levels(&self) -> bool {
        !self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn has_level_value(&self, value: i32) -> bool {
        self.levels.contains_value(value)
    }

    pub fn has_level_label(&self, label: &str) -> bool {
        self.levels.contains_label(label)
    }

    pub fn get_label(&self, value: i32) -> Option<&str> {
        self.levels.label_for(value)
    }

    pub fn value_for_label(&self, label: &str) -> Option<i32> {
        self.levels.value_for(label)
    }

    pub fn append_level(&mut self, level: Level) -> Result<()> {
        self.ensure_categorical()?;
        let value = level.value;
        if self.levels.push(level) {
            Ok(())
        } else {
            Err(self.duplicate_level(value))
        }
    }

    pub fn insert_level(&mut self, level: Level) -> Result<()> {
        self.ensure_categorical()?;
        let value = level.value;
        if self.levels.insert_ordered(level) {
            Ok(())
        } else {
            Err(self.duplicate_level(value))
        }
    }

    pub fn set_levels(&mut self, levels: Vec<Level>) -> Result<()> {
        self.ensure_categorical()?;
        let replacement = LevelTable::from_levels(levels);
        if let Cells::Text(values) = &mut self.cells {
            for level in replacement.iter() {
                let Some(old_label) = self.levels.label_for(level.value) else {
                    continue;
                };
                if old_label == level.label || replacement.contains_label(old_label) {
                    continue;
                }
                for value in values.iter_mut().filter(|v| v.as_str() == old_label) {
                    *value = level.label.clone();
                }
            }
        }
        self.levels = replacement;
        for row in 0..self.row_count() {
            if let Some(value) = self.cells.get(row) {
                self.register_level(&value);
            }
        }
        Ok(())
    }

    pub fn clear_levels(&mut self) {
        self.levels.clear();
    }

    pub fn trim_unused_levels(&mut self) {
        if !self.trim_levels {
            return;
        }
        let used = self.used_level_values();
        self.levels
            .retain(|level| level.pinned || used.contains(&level.value));
    }

    pub(crate) fn used_level_values(&self) -> HashSet<i32> {
        (0..self.row_count())
            .filter_map(|row| self.code_for_row(row))
            .collect()
    }

    pub fn set_data_type(&mut self, data_type: DataType) {
        if data_type == self.data_type() {
            return;
        }
        self.cells = Cells::missing(data_type, self.row_count());
        self.levels.clear();
        if !self.measure_type.is_compatible_with(data_type) {
            self.measure_type = data_type.canonical_measure_type();
        }
    }

    pub fn set_measure_type(&mut self, measure_type: MeasureType) {
        if measure_type == self.measure_type {
            return;
        }
        if !measure_type.is_compatible_with(self.data_type()) {
            let data_type = if measure_type.is_categorical() {
                DataType::Integer
            } else {
                DataType::Decimal
            };
            self.cells = Cells::missing(data_type, self.row_count());
            self.levels.clear();
        }
        let was_categorical = self.measure_type.is_categorical();
        self.measure_type = measure_type;
        if !measure_type.is_categorical() {
            self.levels.clear();
        } else if !was_categorical {
            self.rebuild_levels();
        }
    }

    pub fn value(&self, row: usize) -> Result<CellValue> {
        self.cells.get(row).ok_or(DatasetError::RowOutOfRange {
            row,
            row_count: self.row_count(),
        })
    }

    pub fn values(&self) -> impl Iterator<Item = CellValue> + '_ {
        self.cells.iter()
    }

    /// Stores `value` in the column's native representation and returns
    /// what was stored. On categorical columns a label matching a level is
    /// stored as that level, and new values gain a level.
    pub fn set_value(&mut self, row: usize, value: impl Into<CellValue>) -> Result<CellValue> {
        self.check_row(row)?;
        let native = self.to_native(value.into());
        if self.measure_type.is_categorical() {
            self.register_level(&native);
        }
        self.cells.set(row, &native);
        Ok(native)
    }

    pub fn clear_at(&mut self, row: usize) -> Result<()> {
        self.check_row(row)?;
        let missing = CellValue::missing(self.data_type());
        self.cells.set(row, &missing);
        Ok(())
    }

    pub fn empty_text_is_missing(&self) -> bool {
        self.measure_type.is_categorical() || self.missing_values.flags_empty_text()
    }

    pub fn should_treat_as_missing(&self, row: usize) -> Result<bool> {
        let value = self.value(row)?;
        Ok(value.is_missing(self.empty_text_is_missing()) || self.missing_values.matches(&value))
    }

    pub fn is_filter(&self) -> bool {
        self.column_type == ColumnType::Filter && self.active
    }

    pub fn passes_filter(&self, row: usize) -> bool {
        if !matches!(self.should_treat_as_missing(row), Ok(false)) {
            return false;
        }
        match self.cells.get(row) {
            Some(CellValue::Int(v)) => v != 0,
            Some(CellValue::Float(v)) => v != 0.0,
            Some(CellValue::Text(v)) => !v.is_empty(),
            None => false,
        }
    }

    pub fn level_code_at(&self, row: usize) -> Result<Option<i32>> {
        self.check_row(row)?;
        Ok(self.code_for_row(row))
    }

    pub fn fvalue(&self, row: usize) -> Result<FValue<'_>> {
        let value = self.value(row)?;
        if value.is_missing(self.empty_text_is_missing()) {
            return Ok(FValue::Missing);
        }
        if let Some(level) = self.code_for_row(row).and_then(|code| self.levels.by_value(code)) {
            return Ok(FValue::Level(level));
        }
        Ok(FValue::Value(value))
    }

    pub fn determine_dps(&mut self) {
        self.dps = match &self.cells {
            Cells::Integer(_) => 0,
            Cells::Decimal(values) => values.iter().map(|v| calc_dps(*v)).max().unwrap_or(0),
            Cells::Text(values) => values
                .iter()
                .filter_map(|v| parse_finite_f64(v))
                .map(calc_dps)
                .max()
                .unwrap_or(0),
        };
    }

    pub fn validate_invariants(&self) -> std::result::Result<(), String> {
        if !self.measure_type.is_compatible_with(self.data_type()) {
            return Err(format!(
                "column '{}' pairs {} storage with {} measure",
                self.name,
                self.data_type(),
                self.measure_type
            ));
        }
        if !self.measure_type.is_categorical() {
            if self.has_levels() {
                return Err(format!(
                    "{} column '{}' carries {} level(s)",
                    self.measure_type,
                    self.name,
                    self.level_count()
                ));
            }
            return Ok(());
        }
        let empty_is_missing = self.empty_text_is_missing();
        for row in 0..self.row_count() {
            let Some(value) = self.cells.get(row) else {
                continue;
            };
            if value.is_missing(empty_is_missing) {
                continue;
            }
            if self.code_for_row(row).is_none() {
                return Err(format!(
                    "value '{}' at row {row} of '{}' has no level",
                    value, self.name
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn resize(&mut self, row_count: usize) {
        self.cells.resize(row_count);
    }

    pub(crate) fn insert_rows(&mut self, at: usize, count: usize) {
        self.cells.insert_missing(at, count);
    }

    pub(crate) fn delete_rows(&mut self, start: usize, end_inclusive: usize) {
        self.cells.remove_range(start, end_inclusive);
    }

    fn code_for_row(&self, row: usize) -> Option<i32> {
        if !self.measure_type.is_categorical() {
            return None;
        }
        match &self.cells {
            Cells::Integer(values) => values
                .get(row)
                .copied()
                .filter(|v| *v != MISSING_INT && self.levels.contains_value(*v)),
            Cells::Text(values) => values
                .get(row)
                .filter(|v| !v.is_empty())
                .and_then(|v| self.levels.value_for(v)),
            Cells::Decimal(_) => None,
        }
    }

    fn to_native(&self, value: CellValue) -> CellValue {
        match (&self.cells, &value) {
            (Cells::Integer(_), CellValue::Text(text)) if self.measure_type.is_categorical() => {
                match self.levels.value_for(text.trim()) {
                    Some(code) => CellValue::Int(code),
                    None => value.convert_to(DataType::Integer),
                }
            }
            (Cells::Text(_), CellValue::Int(code)) if self.measure_type.is_categorical() => {
                match self.levels.label_for(*code) {
                    Some(label) => CellValue::Text(label.to_string()),
                    None => value.convert_to(DataType::Text),
                }
            }
            _ => value.convert_to(self.data_type()),
        }
    }

    pub(crate) fn register_level(&mut self, native: &CellValue) {
        match native {
            CellValue::Int(v) if *v != MISSING_INT && !self.levels.contains_value(*v) => {
                self.levels.insert_ordered(Level::new(*v, v.to_string()));
            }
            CellValue::Text(text) if !text.is_empty() && !self.levels.contains_label(text) => {
                let code = self.levels.next_value();
                self.levels.push(Level::new(code, text.clone()));
            }
            _ => {}
        }
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row < self.row_count() {
            Ok(())
        } else {
            Err(DatasetError::RowOutOfRange {
                row,
                row_count: self.row_count(),
            })
        }
    }

    fn ensure_categorical(&self) -> Result<()> {
        if self.measure_type.is_categorical() {
            Ok(())
        } else {
            Err(DatasetError::LevelsNotSupported {
                column: self.name.clone(),
                measure_type: self.measure_type,
            })
        }
    }

    fn duplicate_level(&self, value: i32) -> DatasetError {
        DatasetError::DuplicateLevel {
            column: self.name.clone(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_with_rows(rows: usize) -> Column {
        Column::with_rows(1, "score", "", rows)
    }

    #[test]
    fn new_columns_start_missing_and_levelless() {
        let column = column_with_rows(3);
        assert_eq!(column.data_type(), DataType::Integer);
        assert_eq!(column.measure_type(), MeasureType::Nominal);
        assert!(!column.has_levels());
        assert!(column.should_treat_as_missing(2).unwrap());
        assert!(column.validate_invariants().is_ok());
    }

    #[test]
    fn set_value_registers_integer_levels_in_order() {
        let mut column = column_with_rows(3);
        column.set_value(0, 5).unwrap();
        column.set_value(1, 2).unwrap();
        column.set_value(2, 5).unwrap();
        let values: Vec<i32> = column.levels().iter().map(|l| l.value).collect();
        assert_eq!(values, vec![2, 5]);
        assert_eq!(column.level_code_at(0).unwrap(), Some(5));
        assert!(column.validate_invariants().is_ok());
    }

    #[test]
    fn text_labels_map_onto_integer_levels() {
        let mut column = column_with_rows(2);
        column.append_level(Level::new(1, "Male")).unwrap();
        column.append_level(Level::new(2, "Female")).unwrap();
        let stored = column.set_value(0, "Female").unwrap();
        assert_eq!(stored, CellValue::Int(2));
        assert!(matches!(column.fvalue(0).unwrap(), FValue::Level(l) if l.label == "Female"));
        assert_eq!(column.fvalue(1).unwrap(), FValue::Missing);
    }

    #[test]
    fn out_of_range_rows_are_rejected() {
        let mut column = column_with_rows(1);
        assert!(matches!(
            column.set_value(1, 3),
            Err(DatasetError::RowOutOfRange { row: 1, row_count: 1 })
        ));
        assert!(column.value(4).is_err());
    }

    #[test]
    fn continuous_columns_refuse_levels() {
        let mut column = column_with_rows(0);
        column.set_measure_type(MeasureType::Continuous);
        assert!(matches!(
            column.append_level(Level::new(1, "one")),
            Err(DatasetError::LevelsNotSupported { .. })
        ));
    }

    #[test]
    fn duplicate_levels_are_rejected() {
        let mut column = column_with_rows(0);
        column.append_level(Level::new(1, "one")).unwrap();
        assert!(matches!(
            column.insert_level(Level::new(1, "uno")),
            Err(DatasetError::DuplicateLevel { value: 1, .. })
        ));
    }

    #[test]
    fn missing_rules_flag_values_without_changing_storage() {
        let mut column = column_with_rows(2);
        column.set_measure_type(MeasureType::Continuous);
        column.set_value(0, -99).unwrap();
        column.set_value(1, 4).unwrap();
        column.set_missing_values(["== -99"]).unwrap();
        assert!(column.should_treat_as_missing(0).unwrap());
        assert!(!column.should_treat_as_missing(1).unwrap());
        assert_eq!(column.value(0).unwrap(), CellValue::Int(-99));
        assert!(column.set_missing_values(["bogus"]).is_err());
        assert_eq!(column.missing_values().len(), 1);
    }

    #[test]
    fn trim_unused_levels_keeps_pinned() {
        let mut column = column_with_rows(1);
        column.set_data_type(DataType::Text);
        column.set_value(0, "kept").unwrap();
        column.append_level(Level::new(7, "spare").pinned(true)).unwrap();
        column.append_level(Level::new(8, "unused")).unwrap();
        column.trim_unused_levels();
        let labels: Vec<&str> = column.levels().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["kept", "spare"]);
    }

    #[test]
    fn relabelling_text_levels_rewrites_cells() {
        let mut column = column_with_rows(2);
        column.set_data_type(DataType::Text);
        column.set_value(0, "m").unwrap();
        column.set_value(1, "f").unwrap();
        let mut levels = column.levels().clone().into_vec();
        levels[0].label = "male".to_string();
        column.set_levels(levels).unwrap();
        assert_eq!(column.value(0).unwrap(), CellValue::Text("male".into()));
        assert_eq!(column.level_code_at(0).unwrap(), Some(0));
        assert!(column.validate_invariants().is_ok());
    }

    #[test]
    fn determine_dps_uses_stored_values() {
        let mut column = column_with_rows(2);
        column.set_measure_type(MeasureType::Continuous);
        column.set_data_type(DataType::Decimal);
        column.set_value(0, 1.25).unwrap();
        column.set_value(1, 3.5).unwrap();
        column.determine_dps();
        assert_eq!(column.dps(), 2);
    }
}
