//! Hosting records - the persisted view of one hosted application

use serde::{Deserialize, Serialize};

/// Last persisted lifecycle state of a hosted application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostingState {
    /// A process is alive, or was alive when the record was last written
    Running,
    /// No process is expected
    Stopped,
}

impl HostingState {
    pub fn is_running(&self) -> bool {
        matches!(self, HostingState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostingState::Running => "running",
            HostingState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for HostingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One registry entry. The owning identity is the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostingRecord {
    /// Directory name under the workspace root
    pub workspace_name: String,

    /// Command line the application is launched with
    pub launch_command: String,

    pub status: HostingState,
}

impl HostingRecord {
    pub fn running(workspace_name: impl Into<String>, launch_command: impl Into<String>) -> Self {
        Self {
            workspace_name: workspace_name.into(),
            launch_command: launch_command.into(),
            status: HostingState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }
}

/// Inspection result combining the durable record with live state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingInfo {
    pub identity: String,
    pub record: HostingRecord,
    /// Whether the supervisor currently tracks a live process
    pub live: bool,
    /// OS process id of the live process, if known
    pub pid: Option<u32>,
}
