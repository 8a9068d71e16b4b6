//! Shared library for the anime-enrich project.
//!
//! This crate provides common functionality used across the binary crates:
//! - Configuration management (TOML settings + environment secrets)
//! - MongoDB document models and the anime collection store
//! - Name matching and filename sanitization helpers
//! - JSON response snapshots
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod models;
pub mod names;
pub mod snapshot;
pub mod store;

// Re-export commonly used types
pub use config::{Config, FtpSecrets, Secrets};
pub use logging::LogConfig;
pub use models::*;
pub use snapshot::SnapshotWriter;
pub use store::AnimeStore;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
