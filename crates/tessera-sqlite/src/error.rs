//! Error types for SQLite storage

use rusqlite::ErrorCode;
use tessera_core::{TesseraError, Transient};
use thiserror::Error;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Stored data could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid table name or other configuration problem
    #[error("Configuration error: {0}")]
    Config(#[from] tessera_config::ConfigError),

    /// The blocking task running the query panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl SqliteError {
    /// The SQLite result code, if this came from the engine
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Rusqlite(rusqlite::Error::SqliteFailure(err, _)) => Some(err.code),
            _ => None,
        }
    }
}

impl Transient for SqliteError {
    fn is_transient(&self) -> bool {
        matches!(
            self.code(),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        )
    }
}

impl From<serde_json::Error> for SqliteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<SqliteError> for TesseraError {
    fn from(err: SqliteError) -> Self {
        if err.is_transient() {
            return Self::TransientStorage {
                attempts: 1,
                message: err.to_string(),
            };
        }
        match err {
            SqliteError::Config(e) => Self::Configuration(e.to_string()),
            other => Self::PermanentStorage(other.to_string()),
        }
    }
}
