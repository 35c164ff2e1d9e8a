//! JSON file store

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads and writes whole JSON documents under a base directory
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir).map_err(|e| {
                Error::Storage(format!(
                    "Failed to create directory {}: {}",
                    self.base_dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Load a document; the file must exist and parse
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        let path = self.file_path(filename);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load a document, treating a missing or blank file as `None`
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Storage(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load a document, falling back to `T::default()` when missing or blank
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, filename: &str) -> Result<T> {
        Ok(self.load_optional(filename)?.unwrap_or_default())
    }

    /// Overwrite a document.
    ///
    /// Writes a sibling temp file first and renames it into place so readers
    /// never see a half-written document.
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.file_path(filename);
        let tmp = self.file_path(&format!("{}.tmp", filename));
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Storage(format!("Failed to serialize: {}", e)))?;
        std::fs::write(&tmp, content)
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| Error::Storage(format!("Failed to replace {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Document saved");
        Ok(())
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.file_path(filename).exists()
    }

    pub fn remove(&self, filename: &str) -> Result<()> {
        let path = self.file_path(filename);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                Error::Storage(format!("Failed to remove {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_and_blank_files_load_as_none() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());

        let missing: Option<BTreeMap<String, u32>> = store.load_optional("data.json").unwrap();
        assert!(missing.is_none());

        std::fs::write(store.file_path("data.json"), "  \n").unwrap();
        let blank: BTreeMap<String, u32> = store.load_or_default("data.json").unwrap();
        assert!(blank.is_empty());
    }

    #[test]
    fn test_save_creates_directory_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path().join("nested"));

        let mut data = BTreeMap::new();
        data.insert("a".to_string(), 1u32);
        data.insert("b".to_string(), 2u32);
        store.save("data.json", &data).unwrap();

        data.remove("a");
        store.save("data.json", &data).unwrap();

        let loaded: BTreeMap<String, u32> = store.load("data.json").unwrap();
        assert_eq!(loaded, data);
        assert!(!store.exists("data.json.tmp"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());
        std::fs::write(store.file_path("data.json"), "{not json").unwrap();

        let result: Result<Option<BTreeMap<String, u32>>> = store.load_optional("data.json");
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[test]
    fn test_remove() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());
        store.save("data.json", &vec![1, 2, 3]).unwrap();
        assert!(store.exists("data.json"));

        store.remove("data.json").unwrap();
        assert!(!store.exists("data.json"));
        // removing twice is fine
        store.remove("data.json").unwrap();
    }
}
