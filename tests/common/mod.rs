#![allow(dead_code)]

use std::cell::Cell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use statsheet::{
    BackingStore, CellValue, CellWrite, ColumnId, Dataset, DatasetHandle, MemoryStore, StoreError,
    inference::infer_dataset, settings::ImportSettings,
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("write temp bytes");
        path
    }
}

/// Infers a dataset from inline CSV-ish text (comma separated, no quoting).
pub fn dataset_from_text(text: &str) -> Dataset {
    let mut lines = text.lines();
    let header = lines
        .next()
        .map(split_line)
        .unwrap_or_default();
    let rows: Vec<Vec<String>> = lines.map(split_line).collect();
    infer_dataset(&header, &rows, &ImportSettings::default()).expect("infer dataset")
}

fn split_line(line: &str) -> Vec<String> {
    line.split(',').map(str::to_string).collect()
}

/// Memory store that records every batch and can be told to fail. The
/// failure switch is shared so a test can flip it after handing the store
/// to a session.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    pub batches: Vec<Vec<CellWrite>>,
    pub fail_next: Rc<Cell<bool>>,
}

impl BackingStore for RecordingStore {
    fn create_dataset(&mut self) -> Result<DatasetHandle, StoreError> {
        self.inner.create_dataset()
    }

    fn set_row_count(&mut self, handle: DatasetHandle, row_count: usize) -> Result<(), StoreError> {
        self.inner.set_row_count(handle, row_count)
    }

    fn append_column(&mut self, handle: DatasetHandle, name: &str) -> Result<ColumnId, StoreError> {
        self.inner.append_column(handle, name)
    }

    fn insert_column(
        &mut self,
        handle: DatasetHandle,
        index: usize,
        name: &str,
    ) -> Result<ColumnId, StoreError> {
        self.inner.insert_column(handle, index, name)
    }

    fn delete_columns(
        &mut self,
        handle: DatasetHandle,
        start: usize,
        end: usize,
    ) -> Result<(), StoreError> {
        self.inner.delete_columns(handle, start, end)
    }

    fn set_values(&mut self, handle: DatasetHandle, batch: &[CellWrite]) -> Result<(), StoreError> {
        if self.fail_next.replace(false) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.batches.push(batch.to_vec());
        self.inner.set_values(handle, batch)
    }

    fn row_count(&self, handle: DatasetHandle) -> Result<usize, StoreError> {
        self.inner.row_count(handle)
    }

    fn value(
        &self,
        handle: DatasetHandle,
        row: usize,
        column: ColumnId,
    ) -> Result<Option<CellValue>, StoreError> {
        self.inner.value(handle, row, column)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.inner.close()
    }
}
