//! The dataset: an ordered set of equal-length columns.
//!
//! Row and column edits keep every column at the shared `row_count`, new
//! cells start as their column's missing sentinel, and column ids are
//! handed out once and never reused.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use anyhow::{Context, Result as AnyResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    column::Column,
    error::{DatasetError, Result},
    levels::Level,
    missing::MissingValues,
    value::{CellValue, ColumnType, DataType, MeasureType},
};

pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
    next_id: i32,
    filtered: Vec<bool>,
    visible: Vec<usize>,
    weights: Option<i32>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn append_column(&mut self, name: impl Into<String>) -> &mut Column {
        let index = self.columns.len();
        self.insert_at(index, name.into())
    }

    pub fn insert_column(&mut self, index: usize, name: impl Into<String>) -> Result<&mut Column> {
        if index > self.columns.len() {
            return Err(DatasetError::ColumnOutOfRange {
                index,
                column_count: self.columns.len(),
            });
        }
        Ok(self.insert_at(index, name.into()))
    }

    fn insert_at(&mut self, index: usize, name: String) -> &mut Column {
        let id = self.next_id;
        self.next_id += 1;
        let column = Column::with_rows(id, name.clone(), name, self.row_count);
        self.columns.insert(index, column);
        self.reindex();
        &mut self.columns[index]
    }

    pub fn delete_columns(&mut self, start: usize, end: usize) -> Result<Vec<Column>> {
        if start > end {
            return Err(DatasetError::InvalidRange { start, end });
        }
        if end >= self.columns.len() {
            return Err(DatasetError::ColumnOutOfRange {
                index: end,
                column_count: self.columns.len(),
            });
        }
        let removed: Vec<Column> = self.columns.drain(start..=end).collect();
        self.reindex();
        if let Some(weights) = self.weights
            && removed.iter().any(|c| c.id == weights)
        {
            debug!("Weights column #{weights} deleted, clearing weights");
            self.weights = None;
        }
        if removed.iter().any(Column::is_filter) {
            self.refresh_filter_state();
        }
        debug!("Deleted {} column(s) at {start}..={end}", removed.len());
        Ok(removed)
    }

    pub fn set_row_count(&mut self, row_count: usize) {
        for column in &mut self.columns {
            column.resize(row_count);
        }
        self.row_count = row_count;
        self.refresh_filter_state();
    }

    pub fn append_rows(&mut self, count: usize) {
        self.set_row_count(self.row_count + count);
    }

    pub fn insert_rows(&mut self, start: usize, end: usize) -> Result<()> {
        if start > end {
            return Err(DatasetError::InvalidRange { start, end });
        }
        if start > self.row_count {
            return Err(DatasetError::RowOutOfRange {
                row: start,
                row_count: self.row_count,
            });
        }
        let count = end - start + 1;
        for column in &mut self.columns {
            column.insert_rows(start, count);
        }
        self.row_count += count;
        self.refresh_filter_state();
        Ok(())
    }

    pub fn delete_rows(&mut self, start: usize, end: usize) -> Result<()> {
        if start > end {
            return Err(DatasetError::InvalidRange { start, end });
        }
        if end >= self.row_count {
            return Err(DatasetError::RowOutOfRange {
                row: end,
                row_count: self.row_count,
            });
        }
        for column in &mut self.columns {
            column.delete_rows(start, end);
            column.trim_unused_levels();
        }
        self.row_count -= end - start + 1;
        self.refresh_filter_state();
        Ok(())
    }

    pub fn column(&self, index: usize) -> Result<&Column> {
        let column_count = self.columns.len();
        self.columns
            .get(index)
            .ok_or(DatasetError::ColumnOutOfRange {
                index,
                column_count,
            })
    }

    pub fn column_mut(&mut self, index: usize) -> Result<&mut Column> {
        let column_count = self.columns.len();
        self.columns
            .get_mut(index)
            .ok_or(DatasetError::ColumnOutOfRange {
                index,
                column_count,
            })
    }

    pub fn column_by_name(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DatasetError::ColumnNotFound(name.to_string()))
    }

    pub fn column_by_name_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| DatasetError::ColumnNotFound(name.to_string()))
    }

    pub fn column_by_id(&self, id: i32) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| DatasetError::ColumnNotFound(format!("#{id}")))
    }

    pub fn column_by_id_mut(&mut self, id: i32) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| DatasetError::ColumnNotFound(format!("#{id}")))
    }

    pub fn value(&self, row: usize, column: usize) -> Result<CellValue> {
        self.column(column)?.value(row)
    }

    pub fn set_value(
        &mut self,
        row: usize,
        column: usize,
        value: impl Into<CellValue>,
    ) -> Result<CellValue> {
        let target = self.column_mut(column)?;
        let stored = target.set_value(row, value)?;
        if target.is_filter() {
            self.refresh_filter_state();
        }
        Ok(stored)
    }

    pub fn clear_at(&mut self, row: usize, column: usize) -> Result<CellValue> {
        let target = self.column_mut(column)?;
        target.clear_at(row)?;
        let cleared = CellValue::missing(target.data_type());
        if target.is_filter() {
            self.refresh_filter_state();
        }
        Ok(cleared)
    }

    /// Recomputes which rows the active FILTER columns exclude. Call after
    /// changing a column's type or active flag through `column_mut`.
    pub fn refresh_filter_state(&mut self) {
        let filters: Vec<&Column> = self.columns.iter().filter(|c| c.is_filter()).collect();
        self.filtered = (0..self.row_count)
            .map(|row| filters.iter().any(|column| !column.passes_filter(row)))
            .collect();
        self.visible = self
            .filtered
            .iter()
            .enumerate()
            .filter_map(|(row, filtered)| (!filtered).then_some(row))
            .collect();
    }

    pub fn has_filters(&self) -> bool {
        self.columns.iter().any(Column::is_filter)
    }

    pub fn is_row_filtered(&self, row: usize) -> Result<bool> {
        self.filtered
            .get(row)
            .copied()
            .ok_or(DatasetError::RowOutOfRange {
                row,
                row_count: self.row_count,
            })
    }

    pub fn row_count_ex_filtered(&self) -> usize {
        self.visible.len()
    }

    /// The underlying row shown at position `index` once filtered rows are
    /// hidden.
    pub fn get_index_ex_filtered(&self, index: usize) -> Result<usize> {
        self.visible
            .get(index)
            .copied()
            .ok_or(DatasetError::RowOutOfRange {
                row: index,
                row_count: self.visible.len(),
            })
    }

    pub fn get_indices_ex_filtered(&self, row_start: usize, row_count: usize) -> Result<Vec<usize>> {
        (row_start..row_start + row_count)
            .map(|index| self.get_index_ex_filtered(index))
            .collect()
    }

    pub fn weights(&self) -> Option<i32> {
        self.weights
    }

    pub fn set_weights(&mut self, column_id: Option<i32>) -> Result<()> {
        if let Some(id) = column_id {
            self.column_by_id(id)?;
        }
        self.weights = column_id;
        Ok(())
    }

    pub fn validate_invariants(&self) -> std::result::Result<(), String> {
        for (index, column) in self.columns.iter().enumerate() {
            if column.row_count() != self.row_count {
                return Err(format!(
                    "column '{}' has {} row(s), dataset has {}",
                    column.name,
                    column.row_count(),
                    self.row_count
                ));
            }
            if column.index != index {
                return Err(format!(
                    "column '{}' records index {} but sits at {index}",
                    column.name, column.index
                ));
            }
            column.validate_invariants()?;
        }
        Ok(())
    }

    pub fn schema(&self) -> DatasetSchema {
        DatasetSchema {
            schema_version: Some(CURRENT_SCHEMA_VERSION.to_string()),
            row_count: self.row_count,
            weights: self
                .weights
                .and_then(|id| self.column_by_id(id).ok())
                .map(|column| column.name.clone()),
            columns: self.columns.iter().map(ColumnSchema::from).collect(),
        }
    }

    pub fn apply_schema(&mut self, schema: &DatasetSchema) -> Result<usize> {
        let mut applied = 0;
        for entry in &schema.columns {
            let Ok(column) = self.column_by_name_mut(&entry.name) else {
                warn!("Schema column '{}' is not in the dataset", entry.name);
                continue;
            };
            column.change(Some(entry.data_type), Some(entry.measure_type));
            if column.measure_type().is_categorical() && !entry.levels.is_empty() {
                column.set_levels(entry.levels.clone())?;
            }
            column.missing_values = entry.missing_values.clone();
            column.column_type = entry.column_type;
            column.description = entry.description.clone();
            column.set_dps(entry.dps);
            column.active = entry.active;
            column.formula = entry.formula.clone();
            column.formula_message = entry.formula_message.clone();
            column.auto_measure = false;
            applied += 1;
        }
        if let Some(name) = &schema.weights {
            match self.column_by_name(name) {
                Ok(column) => self.weights = Some(column.id),
                Err(_) => warn!("Weights column '{name}' is not in the dataset"),
            }
        }
        self.refresh_filter_state();
        Ok(applied)
    }

    fn reindex(&mut self) {
        for (index, column) in self.columns.iter_mut().enumerate() {
            column.index = index;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<String>,
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub import_name: String,
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub column_type: ColumnType,
    pub data_type: DataType,
    pub measure_type: MeasureType,
    #[serde(default)]
    pub dps: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default = "default_active", skip_serializing_if = "is_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub formula: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub formula_message: String,
    #[serde(default, skip_serializing_if = "MissingValues::is_empty")]
    pub missing_values: MissingValues,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<Level>,
}

fn default_active() -> bool {
    true
}

fn is_active(active: &bool) -> bool {
    *active
}

impl From<&Column> for ColumnSchema {
    fn from(column: &Column) -> Self {
        Self {
            name: column.name.clone(),
            import_name: column.import_name.clone(),
            id: column.id,
            column_type: column.column_type,
            data_type: column.data_type(),
            measure_type: column.measure_type,
            dps: column.dps,
            description: column.description.clone(),
            active: column.active,
            formula: column.formula.clone(),
            formula_message: column.formula_message.clone(),
            missing_values: column.missing_values.clone(),
            levels: column.levels.as_slice().to_vec(),
        }
    }
}

impl DatasetSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn to_yaml_string(&self) -> AnyResult<String> {
        serde_yaml::to_string(self).context("Serializing dataset schema to YAML string")
    }

    pub fn save(&self, path: &Path) -> AnyResult<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(BufWriter::new(file), self).context("Writing schema YAML")
    }

    pub fn load(path: &Path) -> AnyResult<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context("Parsing schema YAML")
    }
}
