//! Error types for tether_sync
//!
//! Sync, resolution and registry operations never fail outward. Errors only
//! come from parsing user-supplied modes and from configuration I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring the sync engine
#[derive(Error, Debug)]
pub enum SyncError {
    /// Target mode string is not `auto`, `window` or `element:<id>`
    #[error("invalid sync target mode `{0}` (expected `auto`, `window` or `element:<id>`)")]
    InvalidTargetMode(String),

    /// Overlay mode string is not `off`, `browse`, `annotate` or `capture`
    #[error("invalid overlay mode `{0}` (expected `off`, `browse`, `annotate` or `capture`)")]
    InvalidOverlayMode(String),

    /// Failed to read a configuration file
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be written as TOML
    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Result type for tether_sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
