use std::collections::HashMap;

use log::{debug, info};

use crate::{
    buffer::WriteBuffer,
    cache::{AREA_COLUMNS, AreaBlock, DEFAULT_CACHE_AREAS, DataCache},
    coerce::ChangeOutcome,
    dataset::Dataset,
    error::{DatasetError, Result},
    store::{BackingStore, ColumnId, DatasetHandle, StoreResult},
    value::{CellValue, DataType, MeasureType},
};

#[derive(Debug)]
pub struct Session<S: BackingStore> {
    dataset: Dataset,
    buffer: WriteBuffer<S>,
    store_columns: HashMap<i32, ColumnId>,
    cache: DataCache,
    cache_commits: usize,
}

impl<S: BackingStore> Session<S> {
    pub fn create(store: S, max_items: usize) -> Result<Self> {
        Self::from_dataset(Dataset::new(), store, max_items)
    }

    pub fn from_dataset(dataset: Dataset, mut store: S, max_items: usize) -> Result<Self> {
        let handle = store.create_dataset()?;
        store.set_row_count(handle, dataset.row_count())?;
        let mut store_columns = HashMap::new();
        for column in dataset.iter() {
            let id = store.append_column(handle, column.name())?;
            store_columns.insert(column.id(), id);
        }
        let mut session = Self {
            dataset,
            buffer: WriteBuffer::new(store, handle, max_items)?,
            store_columns,
            cache: DataCache::new(DEFAULT_CACHE_AREAS)?,
            cache_commits: 0,
        };
        for index in 0..session.dataset.column_count() {
            session.stage_column(index, 0)?;
        }
        debug!(
            "Session opened on dataset {handle} with {} column(s), {} row(s)",
            session.dataset.column_count(),
            session.dataset.row_count()
        );
        Ok(session)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn buffer(&self) -> &WriteBuffer<S> {
        &self.buffer
    }

    pub fn store(&self) -> &S {
        self.buffer.store()
    }

    pub fn handle(&self) -> DatasetHandle {
        self.buffer.handle()
    }

    pub fn store_column(&self, index: usize) -> Result<ColumnId> {
        let column = self.dataset.column(index)?;
        self.store_columns
            .get(&column.id())
            .copied()
            .ok_or_else(|| DatasetError::ColumnNotFound(column.name().to_string()))
    }

    pub fn set_value(
        &mut self,
        row: usize,
        column: usize,
        value: impl Into<CellValue>,
    ) -> Result<CellValue> {
        let id = self.store_column(column)?;
        self.buffer.make_room(row, id)?;
        let stored = self.dataset.set_value(row, column, value)?;
        self.buffer.stage(row, id, stored.clone())?;
        Ok(stored)
    }

    pub fn clear_at(&mut self, row: usize, column: usize) -> Result<()> {
        let id = self.store_column(column)?;
        self.buffer.make_room(row, id)?;
        let cleared = self.dataset.clear_at(row, column)?;
        self.buffer.stage(row, id, cleared)
    }

    pub fn set_weights(&mut self, column_id: Option<i32>) -> Result<()> {
        self.dataset.set_weights(column_id)
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub fn cached_value(&mut self, row: usize, column: usize) -> Result<Option<CellValue>> {
        self.dataset.column(column)?;
        let row_count = self.dataset.row_count();
        if row >= row_count {
            return Err(DatasetError::RowOutOfRange { row, row_count });
        }
        if self.buffer.commit_count() != self.cache_commits {
            self.cache.clear();
            self.cache_commits = self.buffer.commit_count();
        }
        let handle = self.handle();
        let store = self.buffer.store();
        let dataset = &self.dataset;
        let store_columns = &self.store_columns;
        let value = self.cache.get_value(row, column, |area| -> StoreResult<AreaBlock> {
            let last_column = (area.column_start + AREA_COLUMNS).min(dataset.column_count());
            let ids: Vec<Option<ColumnId>> = (area.column_start..last_column)
                .map(|index| {
                    dataset
                        .column(index)
                        .ok()
                        .and_then(|c| store_columns.get(&c.id()).copied())
                })
                .collect();
            let last_row = area.rows().end.min(row_count);
            (area.row_start..last_row)
                .map(|row| {
                    ids.iter()
                        .map(|id| match id {
                            Some(id) => store.value(handle, row, *id),
                            None => Ok(None),
                        })
                        .collect::<StoreResult<Vec<_>>>()
                })
                .collect()
        })?;
        Ok(value)
    }

    pub fn append_column(&mut self, name: &str) -> Result<usize> {
        let index = self.dataset.column_count();
        self.insert_column(index, name)
    }

    pub fn insert_column(&mut self, index: usize, name: &str) -> Result<usize> {
        self.commit()?;
        self.cache.clear();
        let handle = self.handle();
        let id = self.buffer.store_mut().insert_column(handle, index, name)?;
        let column = self.dataset.insert_column(index, name)?;
        self.store_columns.insert(column.id(), id);
        self.stage_column(index, 0)?;
        Ok(index)
    }

    pub fn delete_columns(&mut self, start: usize, end: usize) -> Result<()> {
        self.commit()?;
        self.cache.clear();
        let removed = self.dataset.delete_columns(start, end)?;
        let handle = self.handle();
        self.buffer.store_mut().delete_columns(handle, start, end)?;
        for column in removed {
            if let Some(id) = self.store_columns.remove(&column.id()) {
                self.buffer.discard_column(id);
            }
        }
        Ok(())
    }

    pub fn set_row_count(&mut self, row_count: usize) -> Result<()> {
        let previous = self.dataset.row_count();
        self.buffer.discard_rows_from(row_count);
        self.commit()?;
        self.cache.clear();
        self.dataset.set_row_count(row_count);
        let handle = self.handle();
        self.buffer.store_mut().set_row_count(handle, row_count)?;
        if row_count > previous {
            self.stage_all(previous)?;
        }
        Ok(())
    }

    pub fn insert_rows(&mut self, start: usize, end: usize) -> Result<()> {
        self.commit()?;
        self.cache.clear();
        self.dataset.insert_rows(start, end)?;
        let handle = self.handle();
        self.buffer
            .store_mut()
            .set_row_count(handle, self.dataset.row_count())?;
        self.stage_all(start)
    }

    pub fn delete_rows(&mut self, start: usize, end: usize) -> Result<()> {
        self.commit()?;
        self.cache.clear();
        self.dataset.delete_rows(start, end)?;
        let handle = self.handle();
        self.buffer
            .store_mut()
            .set_row_count(handle, self.dataset.row_count())?;
        self.stage_all(start)
    }

    pub fn change_column(
        &mut self,
        column: usize,
        data_type: Option<DataType>,
        measure_type: Option<MeasureType>,
    ) -> Result<ChangeOutcome> {
        let outcome = self
            .dataset
            .column_mut(column)?
            .change(data_type, measure_type);
        if outcome.values_changed {
            self.stage_column(column, 0)?;
        }
        Ok(outcome)
    }

    pub fn commit(&mut self) -> Result<usize> {
        self.buffer.commit()
    }

    pub fn close(mut self) -> Result<(Dataset, S)> {
        let committed = self.buffer.commit()?;
        let mut store = self.buffer.into_inner();
        store.close()?;
        info!(
            "Closed session ({committed} write(s) in final commit, {} column(s))",
            self.dataset.column_count()
        );
        Ok((self.dataset, store))
    }

    fn stage_all(&mut self, from_row: usize) -> Result<()> {
        for index in 0..self.dataset.column_count() {
            self.stage_column(index, from_row)?;
        }
        Ok(())
    }

    fn stage_column(&mut self, index: usize, from_row: usize) -> Result<()> {
        let id = self.store_column(index)?;
        for row in from_row..self.dataset.row_count() {
            let value = self.dataset.value(row, index)?;
            self.buffer.stage(row, id, value)?;
        }
        Ok(())
    }
}
