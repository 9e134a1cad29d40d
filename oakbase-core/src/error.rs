// oakbase-core/src/error.rs
// Crate-wide error type and Result alias

use std::fmt;
use std::io;

/// All failures the document engine can surface.
///
/// Errors are plain values: cross-index atomicity is enforced locally
/// (rollback happens before the error surfaces), and the executor keeps
/// running regardless of what a command returned.
#[derive(Debug)]
pub enum OakbaseError {
    /// `ensure_index` was called without a field name
    MissingFieldName,
    /// An insert or update would create a duplicate key in a unique index
    UniqueViolation { field: String, key: String },
    /// Structural check failed (reserved `$` field, dotted field name, non-object document)
    InvalidDocument(String),
    /// Malformed query, update, or aggregation parameter
    InvalidParameter(String),
    /// I/O failure from the storage backend
    Io(io::Error),
    /// JSON encode/decode failure
    Serialization(String),
    /// The persistence log contains an entry that cannot be replayed
    Corruption(String),
}

impl fmt::Display for OakbaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OakbaseError::MissingFieldName => {
                write!(f, "ensure_index requires a fieldName")
            }
            OakbaseError::UniqueViolation { field, key } => {
                write!(f, "unique constraint violated on field '{}' for key {}", field, key)
            }
            OakbaseError::InvalidDocument(msg) => write!(f, "invalid document: {}", msg),
            OakbaseError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            OakbaseError::Io(err) => write!(f, "io error: {}", err),
            OakbaseError::Serialization(msg) => write!(f, "serialization error: {}", msg),
            OakbaseError::Corruption(msg) => write!(f, "corrupted datafile: {}", msg),
        }
    }
}

impl std::error::Error for OakbaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OakbaseError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for OakbaseError {
    fn from(err: io::Error) -> Self {
        OakbaseError::Io(err)
    }
}

impl From<serde_json::Error> for OakbaseError {
    fn from(err: serde_json::Error) -> Self {
        OakbaseError::Serialization(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, OakbaseError>;
