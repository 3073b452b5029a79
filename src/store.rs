//! Backing stores that receive committed cell writes.
//!
//! [`MemoryStore`] keeps everything in process maps. [`JournalStore`]
//! layers an append-only JSON-lines journal over the same model: every
//! operation is one line, flushed as it is written, and reopening the file
//! replays it.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{error::StoreError, value::CellValue};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub i32);

impl fmt::Display for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub row: usize,
    pub column: ColumnId,
    pub value: CellValue,
}

impl CellWrite {
    pub fn new(row: usize, column: ColumnId, value: impl Into<CellValue>) -> Self {
        Self {
            row,
            column,
            value: value.into(),
        }
    }
}

pub trait BackingStore {
    fn create_dataset(&mut self) -> StoreResult<DatasetHandle>;

    fn set_row_count(&mut self, handle: DatasetHandle, row_count: usize) -> StoreResult<()>;

    fn append_column(&mut self, handle: DatasetHandle, name: &str) -> StoreResult<ColumnId>;

    fn insert_column(
        &mut self,
        handle: DatasetHandle,
        index: usize,
        name: &str,
    ) -> StoreResult<ColumnId>;

    fn delete_columns(&mut self, handle: DatasetHandle, start: usize, end: usize)
    -> StoreResult<()>;

    /// Applies the whole batch or, if any write is invalid, none of it.
    fn set_values(&mut self, handle: DatasetHandle, batch: &[CellWrite]) -> StoreResult<()>;

    fn row_count(&self, handle: DatasetHandle) -> StoreResult<usize>;

    fn value(&self, handle: DatasetHandle, row: usize, column: ColumnId)
    -> StoreResult<Option<CellValue>>;

    fn close(&mut self) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
struct StoredColumn {
    id: ColumnId,
    name: String,
    cells: HashMap<usize, CellValue>,
}

#[derive(Debug, Clone, Default)]
struct StoredDataset {
    row_count: usize,
    columns: Vec<StoredColumn>,
    next_column_id: i32,
}

impl StoredDataset {
    fn position(&self, column: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column)
    }

    fn add_column(&mut self, index: usize, name: &str) -> ColumnId {
        let id = ColumnId(self.next_column_id);
        self.next_column_id += 1;
        self.columns.insert(
            index,
            StoredColumn {
                id,
                name: name.to_string(),
                cells: HashMap::new(),
            },
        );
        id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: BTreeMap<DatasetHandle, StoredDataset>,
    next_handle: u64,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn column_names(&self, handle: DatasetHandle) -> StoreResult<Vec<String>> {
        Ok(self
            .dataset(handle)?
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect())
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn dataset(&self, handle: DatasetHandle) -> StoreResult<&StoredDataset> {
        self.ensure_open()?;
        self.datasets
            .get(&handle)
            .ok_or(StoreError::UnknownDataset(handle.0))
    }

    fn dataset_mut(&mut self, handle: DatasetHandle) -> StoreResult<&mut StoredDataset> {
        self.ensure_open()?;
        self.datasets
            .get_mut(&handle)
            .ok_or(StoreError::UnknownDataset(handle.0))
    }

    fn next_handle(&self) -> StoreResult<DatasetHandle> {
        self.ensure_open()?;
        Ok(DatasetHandle(self.next_handle))
    }

    fn next_column(&self, handle: DatasetHandle, index: Option<usize>) -> StoreResult<ColumnId> {
        let dataset = self.dataset(handle)?;
        if let Some(index) = index
            && index > dataset.columns.len()
        {
            return Err(StoreError::ColumnOutOfRange {
                index,
                column_count: dataset.columns.len(),
            });
        }
        Ok(ColumnId(dataset.next_column_id))
    }

    fn check_delete(&self, handle: DatasetHandle, start: usize, end: usize) -> StoreResult<()> {
        let dataset = self.dataset(handle)?;
        if start > end || end >= dataset.columns.len() {
            return Err(StoreError::ColumnOutOfRange {
                index: end,
                column_count: dataset.columns.len(),
            });
        }
        Ok(())
    }

    fn validate(dataset: &StoredDataset, batch: &[CellWrite]) -> StoreResult<Vec<usize>> {
        batch
            .iter()
            .map(|write| {
                if write.row >= dataset.row_count {
                    return Err(StoreError::RowOutOfRange {
                        row: write.row,
                        row_count: dataset.row_count,
                    });
                }
                dataset
                    .position(write.column)
                    .ok_or(StoreError::UnknownColumn(write.column.0))
            })
            .collect()
    }
}

impl BackingStore for MemoryStore {
    fn create_dataset(&mut self) -> StoreResult<DatasetHandle> {
        self.ensure_open()?;
        let handle = DatasetHandle(self.next_handle);
        self.next_handle += 1;
        self.datasets.insert(handle, StoredDataset::default());
        Ok(handle)
    }

    fn set_row_count(&mut self, handle: DatasetHandle, row_count: usize) -> StoreResult<()> {
        let dataset = self.dataset_mut(handle)?;
        dataset.row_count = row_count;
        for column in &mut dataset.columns {
            column.cells.retain(|row, _| *row < row_count);
        }
        Ok(())
    }

    fn append_column(&mut self, handle: DatasetHandle, name: &str) -> StoreResult<ColumnId> {
        let dataset = self.dataset_mut(handle)?;
        let index = dataset.columns.len();
        Ok(dataset.add_column(index, name))
    }

    fn insert_column(
        &mut self,
        handle: DatasetHandle,
        index: usize,
        name: &str,
    ) -> StoreResult<ColumnId> {
        self.next_column(handle, Some(index))?;
        Ok(self.dataset_mut(handle)?.add_column(index, name))
    }

    fn delete_columns(
        &mut self,
        handle: DatasetHandle,
        start: usize,
        end: usize,
    ) -> StoreResult<()> {
        self.check_delete(handle, start, end)?;
        self.dataset_mut(handle)?.columns.drain(start..=end);
        Ok(())
    }

    fn set_values(&mut self, handle: DatasetHandle, batch: &[CellWrite]) -> StoreResult<()> {
        let dataset = self.dataset_mut(handle)?;
        let positions = Self::validate(dataset, batch)?;
        for (write, position) in batch.iter().zip(positions) {
            dataset.columns[position]
                .cells
                .insert(write.row, write.value.clone());
        }
        Ok(())
    }

    fn row_count(&self, handle: DatasetHandle) -> StoreResult<usize> {
        Ok(self.dataset(handle)?.row_count)
    }

    fn value(
        &self,
        handle: DatasetHandle,
        row: usize,
        column: ColumnId,
    ) -> StoreResult<Option<CellValue>> {
        let dataset = self.dataset(handle)?;
        let position = dataset
            .position(column)
            .ok_or(StoreError::UnknownColumn(column.0))?;
        Ok(dataset.columns[position].cells.get(&row).cloned())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        self.closed = true;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JournalValue {
    Int(i32),
    Float(Option<f64>),
    Text(String),
}

impl From<&CellValue> for JournalValue {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Int(v) => JournalValue::Int(*v),
            CellValue::Float(v) if v.is_finite() => JournalValue::Float(Some(*v)),
            CellValue::Float(_) => JournalValue::Float(None),
            CellValue::Text(v) => JournalValue::Text(v.clone()),
        }
    }
}

impl From<JournalValue> for CellValue {
    fn from(value: JournalValue) -> Self {
        match value {
            JournalValue::Int(v) => CellValue::Int(v),
            JournalValue::Float(v) => CellValue::Float(v.unwrap_or(f64::NAN)),
            JournalValue::Text(v) => CellValue::Text(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct JournalWrite {
    row: usize,
    column: ColumnId,
    value: JournalValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalEntry {
    CreateDataset {
        handle: DatasetHandle,
    },
    SetRowCount {
        handle: DatasetHandle,
        row_count: usize,
    },
    AppendColumn {
        handle: DatasetHandle,
        name: String,
        column: ColumnId,
    },
    InsertColumn {
        handle: DatasetHandle,
        index: usize,
        name: String,
        column: ColumnId,
    },
    DeleteColumns {
        handle: DatasetHandle,
        start: usize,
        end: usize,
    },
    SetValues {
        handle: DatasetHandle,
        writes: Vec<JournalWrite>,
    },
}

#[derive(Debug)]
pub struct JournalStore {
    path: PathBuf,
    state: MemoryStore,
    writer: Option<BufWriter<File>>,
    replayed: usize,
}

impl JournalStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let mut state = MemoryStore::new();
        let mut replayed = 0;
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for (idx, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: JournalEntry =
                    serde_json::from_str(&line).map_err(|err| StoreError::CorruptJournal {
                        line: idx + 1,
                        message: err.to_string(),
                    })?;
                replay(&mut state, entry).map_err(|message| StoreError::CorruptJournal {
                    line: idx + 1,
                    message,
                })?;
                replayed += 1;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if replayed > 0 {
            info!("Replayed {replayed} journal entries from {path:?}");
        }
        Ok(Self {
            path: path.to_path_buf(),
            state,
            writer: Some(BufWriter::new(file)),
            replayed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn replayed(&self) -> usize {
        self.replayed
    }

    pub fn datasets(&self) -> Vec<DatasetHandle> {
        self.state.datasets.keys().copied().collect()
    }

    pub fn column_names(&self, handle: DatasetHandle) -> StoreResult<Vec<String>> {
        self.state.column_names(handle)
    }

    fn record(&mut self, entry: &JournalEntry) -> StoreResult<()> {
        let writer = self.writer.as_mut().ok_or(StoreError::Closed)?;
        serde_json::to_writer(&mut *writer, entry)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

fn replay(state: &mut MemoryStore, entry: JournalEntry) -> Result<(), String> {
    fn same<T: PartialEq + fmt::Display>(recorded: T, replayed: T) -> Result<(), String> {
        if recorded == replayed {
            Ok(())
        } else {
            Err(format!("recorded id {recorded} but replay produced {replayed}"))
        }
    }
    let describe = |err: StoreError| err.to_string();
    match entry {
        JournalEntry::CreateDataset { handle } => {
            same(handle, state.create_dataset().map_err(describe)?)
        }
        JournalEntry::SetRowCount { handle, row_count } => {
            state.set_row_count(handle, row_count).map_err(describe)
        }
        JournalEntry::AppendColumn {
            handle,
            name,
            column,
        } => same(column, state.append_column(handle, &name).map_err(describe)?),
        JournalEntry::InsertColumn {
            handle,
            index,
            name,
            column,
        } => same(
            column,
            state.insert_column(handle, index, &name).map_err(describe)?,
        ),
        JournalEntry::DeleteColumns { handle, start, end } => {
            state.delete_columns(handle, start, end).map_err(describe)
        }
        JournalEntry::SetValues { handle, writes } => {
            let batch: Vec<CellWrite> = writes
                .into_iter()
                .map(|w| CellWrite::new(w.row, w.column, CellValue::from(w.value)))
                .collect();
            state.set_values(handle, &batch).map_err(describe)
        }
    }
}

impl BackingStore for JournalStore {
    fn create_dataset(&mut self) -> StoreResult<DatasetHandle> {
        let handle = self.state.next_handle()?;
        self.record(&JournalEntry::CreateDataset { handle })?;
        self.state.create_dataset()
    }

    fn set_row_count(&mut self, handle: DatasetHandle, row_count: usize) -> StoreResult<()> {
        self.state.dataset(handle)?;
        self.record(&JournalEntry::SetRowCount { handle, row_count })?;
        self.state.set_row_count(handle, row_count)
    }

    fn append_column(&mut self, handle: DatasetHandle, name: &str) -> StoreResult<ColumnId> {
        let column = self.state.next_column(handle, None)?;
        self.record(&JournalEntry::AppendColumn {
            handle,
            name: name.to_string(),
            column,
        })?;
        self.state.append_column(handle, name)
    }

    fn insert_column(
        &mut self,
        handle: DatasetHandle,
        index: usize,
        name: &str,
    ) -> StoreResult<ColumnId> {
        let column = self.state.next_column(handle, Some(index))?;
        self.record(&JournalEntry::InsertColumn {
            handle,
            index,
            name: name.to_string(),
            column,
        })?;
        self.state.insert_column(handle, index, name)
    }

    fn delete_columns(
        &mut self,
        handle: DatasetHandle,
        start: usize,
        end: usize,
    ) -> StoreResult<()> {
        self.state.check_delete(handle, start, end)?;
        self.record(&JournalEntry::DeleteColumns { handle, start, end })?;
        self.state.delete_columns(handle, start, end)
    }

    fn set_values(&mut self, handle: DatasetHandle, batch: &[CellWrite]) -> StoreResult<()> {
        MemoryStore::validate(self.state.dataset(handle)?, batch)?;
        let writes = batch
            .iter()
            .map(|write| JournalWrite {
                row: write.row,
                column: write.column,
                value: JournalValue::from(&write.value),
            })
            .collect();
        self.record(&JournalEntry::SetValues { handle, writes })?;
        self.state.set_values(handle, batch)?;
        debug!("Journalled {} cell write(s) to {:?}", batch.len(), self.path);
        Ok(())
    }

    fn row_count(&self, handle: DatasetHandle) -> StoreResult<usize> {
        self.state.row_count(handle)
    }

    fn value(
        &self,
        handle: DatasetHandle,
        row: usize,
        column: ColumnId,
    ) -> StoreResult<Option<CellValue>> {
        self.state.value(handle, row, column)
    }

    fn close(&mut self) -> StoreResult<()> {
        self.state.close()?;
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Journal,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Journal => "journal",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum Store {
    Memory(MemoryStore),
    Journal(JournalStore),
}

impl Store {
    pub fn open(kind: StoreKind, path: Option<&Path>) -> StoreResult<Self> {
        match kind {
            StoreKind::Memory => Ok(Store::Memory(MemoryStore::new())),
            StoreKind::Journal => {
                let path = path.ok_or_else(|| {
                    StoreError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "journal store requires a path",
                    ))
                })?;
                Ok(Store::Journal(JournalStore::open(path)?))
            }
        }
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            Store::Memory(_) => StoreKind::Memory,
            Store::Journal(_) => StoreKind::Journal,
        }
    }

    fn inner(&self) -> &dyn BackingStore {
        match self {
            Store::Memory(store) => store,
            Store::Journal(store) => store,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn BackingStore {
        match self {
            Store::Memory(store) => store,
            Store::Journal(store) => store,
        }
    }
}

impl BackingStore for Store {
    fn create_dataset(&mut self) -> StoreResult<DatasetHandle> {
        self.inner_mut().create_dataset()
    }

    fn set_row_count(&mut self, handle: DatasetHandle, row_count: usize) -> StoreResult<()> {
        self.inner_mut().set_row_count(handle, row_count)
    }

    fn append_column(&mut self, handle: DatasetHandle, name: &str) -> StoreResult<ColumnId> {
        self.inner_mut().append_column(handle, name)
    }

    fn insert_column(
        &mut self,
        handle: DatasetHandle,
        index: usize,
        name: &str,
    ) -> StoreResult<ColumnId> {
        self.inner_mut().insert_column(handle, index, name)
    }

    fn delete_columns(
        &mut self,
        handle: DatasetHandle,
        start: usize,
        end: usize,
    ) -> StoreResult<()> {
        self.inner_mut().delete_columns(handle, start, end)
    }

    fn set_values(&mut self, handle: DatasetHandle, batch: &[CellWrite]) -> StoreResult<()> {
        self.inner_mut().set_values(handle, batch)
    }

    fn row_count(&self, handle: DatasetHandle) -> StoreResult<usize> {
        self.inner().row_count(handle)
    }

    fn value(
        &self,
        handle: DatasetHandle,
        row: usize,
        column: ColumnId,
    ) -> StoreResult<Option<CellValue>> {
        self.inner().value(handle, row, column)
    }

    fn close(&mut self) -> StoreResult<()> {
        self.inner_mut().close()
    }
}
