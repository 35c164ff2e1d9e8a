//! # unicloud-hosting
//!
//! Hosting layer for UniCloud: runs user-submitted applications as
//! supervised child processes.
//!
//! ## Features
//!
//! - Registry of hosting records, persisted as one JSON document
//! - Workspace store unpacking uploaded zip archives
//! - Non-blocking process supervisor with bounded output capture
//! - Boot-time reconciliation of `running` records
//! - Lifecycle events over a broadcast channel

pub mod command;
pub mod log;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod supervisor;
pub mod workspace;

pub use command::LaunchCommand;
pub use log::{LogEntry, LogStream, OutputLog, SharedOutputLog, DEFAULT_LOG_CAPACITY};
pub use reconcile::{ReconcileFailure, ReconcileReport, Reconciler};
pub use record::{HostingInfo, HostingRecord, HostingState};
pub use registry::{Records, Registry};
pub use supervisor::{Supervisor, SupervisorConfig, SupervisorEvent};
pub use workspace::{Workspace, WorkspaceStore};
