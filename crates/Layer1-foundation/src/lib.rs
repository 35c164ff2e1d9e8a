//! # unicloud-foundation
//!
//! Foundation layer for UniCloud:
//! - Error: the shared error enum and `Result` alias
//! - Storage: `JsonStore`, whole-document JSON files
//! - Config: `HostingConfig` loaded from the data directory

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{default_data_dir, HostingConfig, ReconcileConfig, HOSTING_CONFIG_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;
