//! Error types for vault-fs

use std::path::PathBuf;

/// Result type for vault-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vault-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content held by another process or still hydrating; clears on its own.
    #[error("{path} is locked or still changing: {detail}")]
    Locked { path: PathBuf, detail: String },

    /// Permanent read failure unrelated to locking.
    #[error("{path} is unreadable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Destination could not be replaced, even with the forced fallback.
    #[error("Could not replace {path}: {reason}")]
    WriteBlocked { path: PathBuf, reason: String },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} config for {path}: {message}")]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Layout validation failed: {message}")]
    LayoutValidation { message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn locked(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Locked {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Whether retrying later can be expected to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Locked { .. } | Self::WriteBlocked { .. })
    }
}
