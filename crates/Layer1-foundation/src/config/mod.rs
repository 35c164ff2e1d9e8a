//! Config - hosting settings
//!
//! - `hosting.rs` - HostingConfig (workspace root, registry file, log sizes)

mod hosting;

pub use hosting::{default_data_dir, HostingConfig, ReconcileConfig, HOSTING_CONFIG_FILE};
