//! Error types for UniCloud
//!
//! Every library error is funneled through this one enum.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// UniCloud error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Hosting preconditions
    // ========================================================================
    #[error("Identity {0} is already hosting an application")]
    AlreadyHosting(String),

    #[error("No application is running for identity {0}")]
    NotRunning(String),

    #[error("No hosting record found for identity {0}")]
    NotHosted(String),

    #[error("Application for identity {0} is still running; stop it first")]
    StillRunning(String),

    // ========================================================================
    // Launch
    // ========================================================================
    #[error("Failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("Invalid launch command: {0}")]
    InvalidCommand(String),

    #[error("Workspace directory missing: {}", .0.display())]
    WorkspaceMissing(PathBuf),

    #[error("Not a workspace under the workspace root: {}", .0.display())]
    ForeignWorkspace(PathBuf),

    #[error("Archive error: {0}")]
    Archive(String),

    // ========================================================================
    // Configuration / storage
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Precondition failures that a front end should relay to the user as-is.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::AlreadyHosting(_)
                | Error::NotRunning(_)
                | Error::NotHosted(_)
                | Error::StillRunning(_)
                | Error::Spawn { .. }
                | Error::InvalidCommand(_)
                | Error::WorkspaceMissing(_)
                | Error::ForeignWorkspace(_)
                | Error::Archive(_)
        )
    }

    /// Spawn error helper
    pub fn spawn(program: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Spawn {
            program: program.into(),
            message: message.into(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing() {
        assert!(Error::NotRunning("u1".into()).is_user_facing());
        assert!(Error::spawn("node", "not found").is_user_facing());
        assert!(!Error::Storage("disk full".into()).is_user_facing());
        assert!(!Error::from("boom").is_user_facing());
    }

    #[test]
    fn test_display() {
        let err = Error::spawn("node", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Failed to spawn node: No such file or directory"
        );
        let err = Error::WorkspaceMissing(PathBuf::from("/ws/u1"));
        assert_eq!(err.to_string(), "Workspace directory missing: /ws/u1");
        let err = Error::ForeignWorkspace(PathBuf::from("/tmp/u1"));
        assert!(err.is_user_facing());
        assert_eq!(
            err.to_string(),
            "Not a workspace under the workspace root: /tmp/u1"
        );
    }
}
