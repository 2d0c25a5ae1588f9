//! Storage error types

use thiserror::Error;

/// Errors that can occur while reading or writing the archive and state files
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error at {path}: {source}")]
    Serialization {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid archive id: {0:?}")]
    InvalidId(String),
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn serialization(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
