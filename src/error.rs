// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Store unreachable after all connection attempts.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single record is missing critical fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single source document could not be read or parsed.
    #[error("Processing error in {path}: {message}")]
    Processing { path: PathBuf, message: String },

    #[error("Duplicate records for {filename}: {count} points share this filename")]
    DuplicateRecord { filename: String, count: usize },

    /// A store operation failed after the connection was established.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    /// Fatal errors abort the run; everything else is scoped to one item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Connection(_) | SyncError::Configuration(_) | SyncError::InvalidInput(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Connection(_) => "ConnectionError",
            SyncError::Configuration(_) => "ConfigurationError",
            SyncError::InvalidInput(_) => "InvalidInputError",
            SyncError::Validation(_) => "ValidationError",
            SyncError::Processing { .. } => "ProcessingError",
            SyncError::DuplicateRecord { .. } => "DuplicateRecordError",
            SyncError::Store(_) => "StoreError",
            SyncError::Embedding(_) => "EmbeddingError",
            SyncError::Io(_) => "IoError",
            SyncError::Serialization(_) => "SerializationError",
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}
