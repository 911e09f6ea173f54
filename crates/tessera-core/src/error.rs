//! Error types for tessera
//!
//! One enum covers every failure a caller can observe. Storage backends map
//! their native errors into it, classifying lock contention as
//! [`TesseraError::TransientStorage`] so callers can tell "try again later"
//! apart from "this will never work".

use thiserror::Error;

use crate::embedding::EmbeddingError;

/// Errors raised by graph traversal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// `values()`/`all()` was called before `v()`
    #[error("traversal has no start node; call v() first")]
    MissingStart,

    /// Node or predicate was empty where one is required
    #[error("invalid graph argument: {0}")]
    InvalidArgument(String),
}

/// Top-level error type
#[derive(Error, Debug)]
pub enum TesseraError {
    /// Malformed input, e.g. a document without an id
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lock contention that outlived every retry
    #[error("Storage busy after {attempts} attempt(s): {message}")]
    TransientStorage {
        /// Attempts made before giving up
        attempts: u32,
        /// Last error reported by the backend
        message: String,
    },

    /// Any storage failure that retrying will not fix
    #[error("Storage error: {0}")]
    PermanentStorage(String),

    /// Embedding provider failure or output-count mismatch
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Retrieval mode string was not recognised
    #[error("Unknown retrieval mode: '{0}' (expected vector, fulltext, graph or hybrid)")]
    UnknownMode(String),

    /// The caller's cancellation token fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Traversal misuse
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An ingestion call failed part-way; earlier chunks stay committed
    #[error("Ingestion stopped after committing {} document(s): {source}", .committed.len())]
    PartialIngest {
        /// Ids durably stored before the failure
        committed: Vec<String>,
        /// The failure that stopped ingestion
        #[source]
        source: Box<TesseraError>,
    },
}

/// Result type for tessera operations
pub type TesseraResult<T> = Result<T, TesseraError>;

impl TesseraError {
    /// Whether the failure came from lock contention
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStorage { .. })
    }

    /// Ids committed before the failure, for partial ingests
    pub fn committed_ids(&self) -> &[String] {
        match self {
            Self::PartialIngest { committed, .. } => committed,
            _ => &[],
        }
    }
}

impl From<tessera_config::ConfigError> for TesseraError {
    fn from(err: tessera_config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ingest_reports_committed_count() {
        let err = TesseraError::PartialIngest {
            committed: vec!["a".into(), "b".into()],
            source: Box::new(TesseraError::Embedding(EmbeddingError::CountMismatch {
                expected: 3,
                actual: 2,
            })),
        };

        let message = err.to_string();
        assert!(message.contains("2 document(s)"), "{message}");
        assert!(message.contains("expected 3"), "{message}");
        assert_eq!(err.committed_ids(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn only_transient_storage_is_transient() {
        let busy = TesseraError::TransientStorage {
            attempts: 5,
            message: "database is locked".into(),
        };
        assert!(busy.is_transient());
        assert!(!TesseraError::PermanentStorage("disk full".into()).is_transient());
        assert!(!TesseraError::Cancelled.is_transient());
    }

    #[test]
    fn config_errors_convert() {
        let err: TesseraError = tessera_config::validate_identifier("drop table")
            .unwrap_err()
            .into();
        assert!(matches!(err, TesseraError::Configuration(_)));
    }
}
