//! Process-lifetime table cache.
//!
//! One slot per dataset. A slot is filled on first load and then only ever
//! read, so loads take `&self` and share the table through an `Arc`.
//! Invalidation needs `&mut self`.

use super::loader::read_dataset;
use super::schema::Dataset;
use super::table::Table;
use crate::utils::error::SourceError;
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Memoizing loader for the dashboard datasets
#[derive(Debug)]
pub struct TableCache {
    data_dir: PathBuf,
    slots: [OnceLock<Arc<Table>>; Dataset::COUNT],
}

impl TableCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            slots: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load a dataset by name
    ///
    /// # Errors
    /// * `SourceError::DatasetNotFound` - name is not one of the known datasets
    /// * `SourceError::DatasetUnreadable` - backing file missing or malformed
    pub fn load(&self, name: &str) -> Result<Arc<Table>, SourceError> {
        self.load_dataset(name.parse()?)
    }

    /// Load a dataset, reading its file only on the first call
    pub fn load_dataset(&self, dataset: Dataset) -> Result<Arc<Table>, SourceError> {
        let slot = &self.slots[dataset.index()];
        if let Some(table) = slot.get() {
            debug!("Cache hit for {}", dataset);
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(read_dataset(&self.data_dir, dataset)?);
        match slot.set(Arc::clone(&table)) {
            Ok(()) => Ok(table),
            // Another reader filled the slot first; hand out the stored copy
            Err(ours) => Ok(slot.get().map(Arc::clone).unwrap_or(ours)),
        }
    }

    /// Seed a slot with an already-built table
    ///
    /// Returns `false` if the dataset was already cached.
    pub fn prime(&self, dataset: Dataset, table: Table) -> bool {
        self.slots[dataset.index()].set(Arc::new(table)).is_ok()
    }

    pub fn is_cached(&self, dataset: Dataset) -> bool {
        self.slots[dataset.index()].get().is_some()
    }

    /// Drop one cached dataset; the next load re-reads its file
    pub fn invalidate(&mut self, dataset: Dataset) {
        if self.slots[dataset.index()].take().is_some() {
            debug!("Invalidated {}", dataset);
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.take();
        }
    }
}
