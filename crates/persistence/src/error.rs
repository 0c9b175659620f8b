//! Persistence layer errors, wrapping rusqlite and conversion failures.

use rusqlite::ffi;
use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("invalid decimal value in column {column}: {value}")]
    InvalidDecimal { column: String, value: String },

    #[error("invalid {field} value: {value}")]
    InvalidEnumValue { field: String, value: String },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for store operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    /// Create a NotFound error
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the underlying SQLite error is a retryable writer conflict
    /// (SQLITE_BUSY / SQLITE_LOCKED after the busy timeout elapsed).
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
        )
    }

    /// Whether the underlying SQLite error is a UNIQUE or PRIMARY KEY
    /// constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    }
}
