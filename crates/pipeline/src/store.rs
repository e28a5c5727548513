//! On-disk dataset handle used by every mutating pipeline step.

use std::path::{Path, PathBuf};

use icvlp_core::{CoreError, Dataset};

use crate::config::SavePolicy;

/// A dataset together with the document it was loaded from.
#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    dataset: Dataset,
    dirty: bool,
}

impl DatasetStore {
    /// Load the dataset document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let dataset = Dataset::from_json(&path)?;
        Ok(Self {
            path,
            dataset,
            dirty: false,
        })
    }

    /// Wrap an in-memory dataset that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>, dataset: Dataset) -> Self {
        Self {
            path: path.into(),
            dataset,
            dirty: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Mutable access; marks the store as changed.
    pub fn dataset_mut(&mut self) -> &mut Dataset {
        self.dirty = true;
        &mut self.dataset
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the document if anything changed since the last save.
    pub fn save(&mut self) -> Result<(), CoreError> {
        if !self.dirty {
            return Ok(());
        }
        self.dataset.save(&self.path)?;
        self.dirty = false;
        Ok(())
    }

    /// Save after an insertion when the policy asks for it.
    pub fn save_after_insert(&mut self, policy: SavePolicy) -> Result<(), CoreError> {
        match policy {
            SavePolicy::EveryInsert => self.save(),
            SavePolicy::AtEnd => Ok(()),
        }
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icvlp_core::Video;

    #[test]
    fn save_only_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ds.json");

        let mut store = DatasetStore::new(&path, Dataset::new());
        store.save().unwrap();
        assert!(!store.is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

        std::fs::remove_file(&path).unwrap();
        store.save().unwrap();
        assert!(!path.exists(), "clean store must not rewrite the file");
    }

    #[test]
    fn mutation_marks_dirty_and_policy_controls_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ds.json");
        Dataset::new().save(&path).unwrap();

        let mut store = DatasetStore::open(&path).unwrap();
        store
            .dataset_mut()
            .append(Video::new("0001", "s", "u", 1).unwrap())
            .unwrap();

        store.save_after_insert(SavePolicy::AtEnd).unwrap();
        assert_eq!(Dataset::from_json(&path).unwrap().len(), 0);

        store.save_after_insert(SavePolicy::EveryInsert).unwrap();
        assert_eq!(Dataset::from_json(&path).unwrap().len(), 1);
    }
}
