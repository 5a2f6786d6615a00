//! Storage error types.

use thiserror::Error;

/// Storage error type.
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Executor thread or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Store file does not exist
    #[error("Store not found: {0}")]
    NotFound(String),

    /// Store file exists but has never been initialized by its owner
    #[error("Store not initialized: {0}")]
    NotInitialized(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using StorageError.
pub type StorageResult<T> = Result<T, StorageError>;
