use std::{num::NonZeroUsize, ops::Range};

use log::trace;
use lru::LruCache;

use crate::{
    error::{DatasetError, Result},
    value::CellValue,
};

pub const AREA_ROWS: usize = 100;
pub const AREA_COLUMNS: usize = 50;
pub const DEFAULT_CACHE_AREAS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellArea {
    pub row_start: usize,
    pub column_start: usize,
}

impl CellArea {
    pub fn containing(row: usize, column: usize) -> Self {
        Self {
            row_start: row / AREA_ROWS * AREA_ROWS,
            column_start: column / AREA_COLUMNS * AREA_COLUMNS,
        }
    }

    pub fn rows(&self) -> Range<usize> {
        self.row_start..self.row_start + AREA_ROWS
    }

    pub fn columns(&self) -> Range<usize> {
        self.column_start..self.column_start + AREA_COLUMNS
    }
}

pub type AreaBlock = Vec<Vec<Option<CellValue>>>;

/// Least-recently-used cache of whole areas. A miss loads the full area
/// around the requested cell so neighbouring reads hit.
#[derive(Debug)]
pub struct DataCache {
    areas: LruCache<CellArea, AreaBlock>,
    hits: u64,
    misses: u64,
}

impl DataCache {
    pub fn new(max_areas: usize) -> Result<Self> {
        let capacity =
            NonZeroUsize::new(max_areas).ok_or(DatasetError::InvalidCapacity(max_areas))?;
        Ok(Self {
            areas: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        })
    }

    pub fn get_value<E, F>(
        &mut self,
        row: usize,
        column: usize,
        load: F,
    ) -> std::result::Result<Option<CellValue>, E>
    where
        F: FnOnce(CellArea) -> std::result::Result<AreaBlock, E>,
    {
        let area = CellArea::containing(row, column);
        if self.areas.contains(&area) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let block = load(area)?;
            if let Some((evicted, _)) = self.areas.push(area, block)
                && evicted != area
            {
                trace!("Evicted cache area at ({}, {})", evicted.row_start, evicted.column_start);
            }
        }
        Ok(self
            .areas
            .get(&area)
            .and_then(|block| block.get(row - area.row_start))
            .and_then(|cells| cells.get(column - area.column_start))
            .cloned()
            .flatten())
    }

    pub fn clear(&mut self) {
        self.areas.clear();
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
