//! Registry - durable identity -> HostingRecord mapping
//!
//! The whole mapping lives in one JSON document that is rewritten on every
//! save. The registry does no locking of its own; the supervisor serializes
//! every load-mutate-save sequence.

use crate::record::{HostingRecord, HostingState};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use unicloud_foundation::{JsonStore, Result};

/// Registry contents keyed by identity
pub type Records = BTreeMap<String, HostingRecord>;

/// JSON-file backed registry
#[derive(Debug, Clone)]
pub struct Registry {
    store: JsonStore,
    filename: String,
}

impl Registry {
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            store: JsonStore::new(dir),
            filename: filename.into(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> PathBuf {
        self.store.file_path(&self.filename)
    }

    pub fn dir(&self) -> &Path {
        self.store.base_dir()
    }

    /// Load every record. A missing or empty file is an empty registry.
    pub fn load(&self) -> Result<Records> {
        self.store.load_or_default(&self.filename)
    }

    /// Replace the persisted mapping with `records`
    pub fn save(&self, records: &Records) -> Result<()> {
        self.store.save(&self.filename, records)
    }

    pub fn get(&self, identity: &str) -> Result<Option<HostingRecord>> {
        Ok(self.load()?.remove(identity))
    }

    /// Load, apply `f`, save. Returns whatever `f` returns.
    pub fn update<T>(&self, f: impl FnOnce(&mut Records) -> T) -> Result<T> {
        let mut records = self.load()?;
        let out = f(&mut records);
        self.save(&records)?;
        Ok(out)
    }

    /// Set the status of an existing record. Returns `false` when no record
    /// exists for `identity`, in which case nothing is written.
    pub fn set_status(&self, identity: &str, status: HostingState) -> Result<bool> {
        let mut records = self.load()?;
        match records.get_mut(identity) {
            Some(record) => {
                record.status = status;
                self.save(&records)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
