use std::collections::HashMap;

use log::{debug, warn};

use crate::{
    error::{DatasetError, Result},
    store::{BackingStore, CellWrite, ColumnId, DatasetHandle},
    value::CellValue,
};

/// Pending `(row, column, value)` writes for one dataset, committed to the
/// store in a single `set_values` call. Staging a new key into a full
/// buffer commits first; re-staging a key overwrites it in place.
#[derive(Debug)]
pub struct WriteBuffer<S: BackingStore> {
    store: S,
    handle: DatasetHandle,
    max_items: usize,
    staged: Vec<CellWrite>,
    positions: HashMap<(usize, ColumnId), usize>,
    commits: usize,
}

impl<S: BackingStore> WriteBuffer<S> {
    pub fn new(store: S, handle: DatasetHandle, max_items: usize) -> Result<Self> {
        if max_items == 0 {
            return Err(DatasetError::InvalidCapacity(max_items));
        }
        Ok(Self {
            store,
            handle,
            max_items,
            staged: Vec::new(),
            positions: HashMap::new(),
            commits: 0,
        })
    }

    pub fn handle(&self) -> DatasetHandle {
        self.handle
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn pending(&self) -> &[CellWrite] {
        &self.staged
    }

    pub fn staged_value(&self, row: usize, column: ColumnId) -> Option<&CellValue> {
        self.positions
            .get(&(row, column))
            .map(|idx| &self.staged[*idx].value)
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Commits if staging a new `(row, column)` key would overflow the
    /// buffer. A following `stage` of that key cannot fail.
    pub fn make_room(&mut self, row: usize, column: ColumnId) -> Result<()> {
        if !self.positions.contains_key(&(row, column)) && self.staged.len() >= self.max_items {
            self.commit()?;
        }
        Ok(())
    }

    pub fn stage(&mut self, row: usize, column: ColumnId, value: impl Into<CellValue>) -> Result<()> {
        let value = value.into();
        if let Some(idx) = self.positions.get(&(row, column)) {
            self.staged[*idx].value = value;
            return Ok(());
        }
        self.make_room(row, column)?;
        self.positions.insert((row, column), self.staged.len());
        self.staged.push(CellWrite { row, column, value });
        Ok(())
    }

    pub fn commit(&mut self) -> Result<usize> {
        if self.staged.is_empty() {
            return Ok(0);
        }
        let count = self.staged.len();
        if let Err(err) = self.store.set_values(self.handle, &self.staged) {
            warn!("Commit of {count} write(s) failed: {err}");
            return Err(err.into());
        }
        self.staged.clear();
        self.positions.clear();
        self.commits += 1;
        debug!("Committed {count} write(s) to dataset {}", self.handle);
        Ok(count)
    }

    pub fn discard_column(&mut self, column: ColumnId) {
        if !self.positions.keys().any(|(_, c)| *c == column) {
            return;
        }
        self.staged.retain(|write| write.column != column);
        self.reindex();
    }

    pub fn discard_rows_from(&mut self, row_count: usize) {
        self.staged.retain(|write| write.row < row_count);
        self.reindex();
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn reindex(&mut self) {
        self.positions = self
            .staged
            .iter()
            .enumerate()
            .map(|(idx, write)| ((write.row, write.column), idx))
            .collect();
    }
}
