//! Hosting Config - settings shared by the supervisor and the front end

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name inside the data directory
pub const HOSTING_CONFIG_FILE: &str = "config.json";

/// Directory name of the default data directory
const APP_DIR: &str = "unicloud";

/// Default data directory (`<platform data dir>/unicloud`, or `./unicloud`)
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Reconciliation behaviour at boot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileConfig {
    /// Mark records whose relaunch failed as `stopped` instead of leaving
    /// them `running`
    #[serde(default)]
    pub mark_failed_stopped: bool,
}

/// Hosting configuration, stored as `config.json` in the data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostingConfig {
    /// Root directory holding one workspace per hosted application.
    /// Relative paths resolve against the data directory.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Registry file name inside the data directory
    #[serde(default = "default_registry_file")]
    pub registry_file: String,

    /// Captured output lines kept per live process
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Lines shown by `console` when no count is given
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,

    /// Seconds a stopped application gets to exit after SIGTERM before it
    /// is killed outright
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("hospedagem")
}

fn default_registry_file() -> String {
    "usersdata.json".to_string()
}

fn default_log_capacity() -> usize {
    10
}

fn default_tail_lines() -> usize {
    5
}

fn default_stop_grace_secs() -> u64 {
    10
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            registry_file: default_registry_file(),
            log_capacity: default_log_capacity(),
            tail_lines: default_tail_lines(),
            stop_grace_secs: default_stop_grace_secs(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl HostingConfig {
    /// Load from `<data_dir>/config.json`; a missing file yields defaults
    pub fn load(data_dir: &Path) -> Result<Self> {
        let store = JsonStore::new(data_dir);
        let config: Self = store
            .load_optional(HOSTING_CONFIG_FILE)
            .map_err(|e| Error::Config(e.to_string()))?
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        JsonStore::new(data_dir).save(HOSTING_CONFIG_FILE, self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            return Err(Error::Config("logCapacity must be at least 1".to_string()));
        }
        if self.tail_lines == 0 {
            return Err(Error::Config("tailLines must be at least 1".to_string()));
        }
        if self.registry_file.trim().is_empty() {
            return Err(Error::Config("registryFile must not be empty".to_string()));
        }
        Ok(())
    }

    /// Absolute workspace root for a data directory
    pub fn workspace_root(&self, data_dir: &Path) -> PathBuf {
        if self.workspace_root.is_absolute() {
            self.workspace_root.clone()
        } else {
            data_dir.join(&self.workspace_root)
        }
    }
}
