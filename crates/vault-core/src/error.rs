//! Error types for vault-core

use std::path::PathBuf;

/// Result type for vault-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or running a sync pass
///
/// Per-path failures during a pass never surface here; they are recorded in
/// the pass report instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Settings parsed but failed validation
    #[error("Invalid settings: {message}")]
    InvalidSettings { message: String },

    /// Exclusion or ephemeral-name pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from vault-fs
    #[error(transparent)]
    Fs(#[from] vault_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            message: message.into(),
        }
    }
}
