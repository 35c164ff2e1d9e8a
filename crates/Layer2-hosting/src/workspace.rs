//! Workspace store - one directory of unpacked application code per
//! hosted application, all under a single root

use rand::Rng;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use unicloud_foundation::{Error, Result};

/// Attempts at finding an unused directory name before giving up
const MAX_NAME_ATTEMPTS: usize = 32;

/// A materialized workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Directory name, as stored in the registry
    pub name: String,
    /// Absolute directory path
    pub path: PathBuf,
}

/// Owns the workspace root directory
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    root: PathBuf,
}

impl WorkspaceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            Error::Storage(format!(
                "Failed to create workspace root {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    /// Directory path for a workspace name
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_dir()
    }

    /// Whether `path` names a workspace directly under the root
    pub fn contains(&self, path: &Path) -> bool {
        path.file_name().is_some() && path.parent() == Some(self.root.as_path())
    }

    /// Unpack a zip archive into a fresh directory named
    /// `<base>_<NN><letter>` and return it.
    ///
    /// Nothing is left on disk when the archive cannot be extracted.
    pub fn materialize(&self, base: &str, archive: &[u8]) -> Result<Workspace> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive))
            .map_err(|e| Error::Archive(format!("not a valid zip archive: {}", e)))?;

        self.ensure_root()?;
        let workspace = self.create_unique_dir(base)?;

        if let Err(e) = zip.extract(&workspace.path) {
            warn!(workspace = %workspace.name, error = %e, "Archive extraction failed");
            if let Err(cleanup) = std::fs::remove_dir_all(&workspace.path) {
                warn!(workspace = %workspace.name, error = %cleanup, "Failed to clean up workspace");
            }
            return Err(Error::Archive(format!("failed to extract archive: {}", e)));
        }

        info!(
            workspace = %workspace.name,
            files = zip.len(),
            "Workspace materialized"
        );
        Ok(workspace)
    }

    /// Delete a workspace directory tree. A directory that is already gone
    /// is not an error.
    pub fn remove(&self, path: &Path) -> Result<()> {
        if !self.contains(path) {
            return Err(Error::Storage(format!(
                "Refusing to remove {}: not a workspace under {}",
                path.display(),
                self.root.display()
            )));
        }

        match std::fs::remove_dir_all(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Workspace removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn create_unique_dir(&self, base: &str) -> Result<Workspace> {
        let base = sanitize_base(base);
        let mut rng = rand::thread_rng();

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = format!("{}_{}", base, random_suffix(&mut rng));
            let path = self.path_for(&name);
            match std::fs::create_dir(&path) {
                Ok(()) => return Ok(Workspace { name, path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(Error::Storage(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        Err(Error::Storage(format!(
            "No free workspace name for `{}` after {} attempts",
            base, MAX_NAME_ATTEMPTS
        )))
    }
}

/// Keep `[A-Za-z0-9_-]`, replace everything else with `_`
fn sanitize_base(base: &str) -> String {
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "app".to_string()
    } else {
        cleaned
    }
}

/// Two digits (10-99) followed by a lowercase letter, e.g. `42k`
fn random_suffix(rng: &mut impl Rng) -> String {
    let number: u8 = rng.gen_range(10..100);
    let letter = rng.gen_range(b'a'..=b'z') as char;
    format!("{}{}", number, letter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_suffix_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let suffix = random_suffix(&mut rng);
            assert_eq!(suffix.len(), 3);
            let number: u8 = suffix[..2].parse().unwrap();
            assert!((10..=99).contains(&number));
            assert!(suffix.as_bytes()[2].is_ascii_lowercase());
        }
    }

    #[test]
    fn test_sanitize_base() {
        assert_eq!(sanitize_base("alice"), "alice");
        assert_eq!(sanitize_base("al ice/../x"), "al_ice____x");
        assert_eq!(sanitize_base("  "), "app");
    }

    #[test]
    fn test_materialize_extracts_files() {
        let temp = TempDir::new().unwrap();
        let store = WorkspaceStore::new(temp.path().join("hospedagem"));

        let bytes = archive(&[("index.js", "console.log('hi')"), ("lib/util.js", "//")]);
        let workspace = store.materialize("alice", &bytes).unwrap();

        assert!(workspace.name.starts_with("alice_"));
        assert_eq!(workspace.path, store.path_for(&workspace.name));
        assert_eq!(
            std::fs::read_to_string(workspace.path.join("index.js")).unwrap(),
            "console.log('hi')"
        );
        assert!(workspace.path.join("lib/util.js").is_file());
        assert!(store.exists(&workspace.name));
    }

    #[test]
    fn test_materialize_twice_gives_distinct_dirs() {
        let temp = TempDir::new().unwrap();
        let store = WorkspaceStore::new(temp.path());
        let bytes = archive(&[("a.txt", "a")]);

        let first = store.materialize("bob", &bytes).unwrap();
        let second = store.materialize("bob", &bytes).unwrap();
        assert_ne!(first.name, second.name);
    }

    #[test]
    fn test_invalid_archive_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let store = WorkspaceStore::new(temp.path().join("ws"));

        let result = store.materialize("carol", b"definitely not a zip");
        assert!(matches!(result, Err(Error::Archive(_))));
        assert!(!store.root().exists() || std::fs::read_dir(store.root()).unwrap().next().is_none());
    }

    #[test]
    fn test_remove() {
        let temp = TempDir::new().unwrap();
        let store = WorkspaceStore::new(temp.path());
        let workspace = store.materialize("dave", &archive(&[("a.txt", "a")])).unwrap();

        store.remove(&workspace.path).unwrap();
        assert!(!workspace.path.exists());
        // already gone
        store.remove(&workspace.path).unwrap();
    }

    #[test]
    fn test_contains() {
        let store = WorkspaceStore::new("/srv/hospedagem");
        assert!(store.contains(Path::new("/srv/hospedagem/alice_42k")));
        assert!(!store.contains(Path::new("/srv/hospedagem")));
        assert!(!store.contains(Path::new("/srv/other/alice_42k")));
        assert!(!store.contains(Path::new("/srv/hospedagem/a/b")));
    }

    #[test]
    fn test_remove_outside_root_refused() {
        let temp = TempDir::new().unwrap();
        let store = WorkspaceStore::new(temp.path().join("ws"));
        std::fs::create_dir_all(temp.path().join("other")).unwrap();

        assert!(store.remove(&temp.path().join("other")).is_err());
        assert!(store.remove(&store.path_for("..")).is_err());
        assert!(temp.path().join("other").exists());
    }
}
