// fastdb-core/src/error.rs
//! Error taxonomy shared by every FastDB component.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastDbError {
    /// Missing or invalid database name, root path or collection name
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Target document(s) or collection file absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// On-disk content unparsable or malformed
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Underlying filesystem failure
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised by the model helper when a field validator rejects a value
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed patch, filter, predicate or identifier supplied by the caller
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The mutation is applied in memory but the save failed, so the
    /// in-memory state is ahead of the durable state.
    #[error("Collection '{collection}' changed in memory but was not persisted: {source}")]
    Unpersisted {
        collection: String,
        #[source]
        source: Box<FastDbError>,
    },
}

impl FastDbError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FastDbError::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FastDbError::NotFound(_))
    }
}

impl From<serde_json::Error> for FastDbError {
    fn from(err: serde_json::Error) -> Self {
        FastDbError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FastDbError>;
