//! Storage error types
//!
//! Defines all errors that can occur in the storage layer.

use thiserror::Error;

/// Errors that can occur in the storage engine
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization of a stored column failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored or supplied value is outside its domain
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Requested row does not exist or is not visible to the caller
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Row already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced row belongs to a different parent (e.g. an add-on of another food)
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found("Meal", "abc");
        assert_eq!(err.to_string(), "Meal not found: abc");

        let err = StorageError::Conflict("profile already exists".to_string());
        assert_eq!(err.to_string(), "Conflict: profile already exists");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let storage_err: StorageError = json_err.into();
        assert!(matches!(storage_err, StorageError::Serialization(_)));
    }
}
