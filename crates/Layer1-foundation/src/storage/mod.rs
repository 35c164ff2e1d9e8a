//! Storage module for UniCloud
//!
//! - `json`: whole-document JSON files (registry, config)

mod json;

pub use json::JsonStore;
