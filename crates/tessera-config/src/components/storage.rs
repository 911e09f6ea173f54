//! Storage component configuration
//!
//! Connection settings for the SQLite execution surface plus the names of the
//! two tables the engine owns.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path value that selects an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Storage component configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path, or `:memory:`
    pub path: PathBuf,
    /// Enable write-ahead logging (ignored for in-memory databases)
    pub wal_mode: bool,
    /// Enforce foreign keys
    pub foreign_keys: bool,
    /// How long SQLite itself waits on a lock before reporting busy
    pub busy_timeout_ms: u32,
    /// `PRAGMA cache_size` value (negative means KiB)
    pub cache_size: i64,
    /// `PRAGMA mmap_size` in bytes, 0 disables
    pub mmap_size: u64,
    /// Table holding documents
    pub documents_table: String,
    /// Table holding graph triples
    pub triples_table: String,
}

impl StorageConfig {
    /// Configuration for a file-backed database
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Configuration for an in-memory database
    pub fn memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    /// Whether this configuration targets an in-memory database
    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(MEMORY_PATH)
    }

    /// Builder-style: override the busy timeout
    #[must_use]
    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u32) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    /// Builder-style: override both table names
    #[must_use]
    pub fn with_tables(
        mut self,
        documents_table: impl Into<String>,
        triples_table: impl Into<String>,
    ) -> Self {
        self.documents_table = documents_table.into();
        self.triples_table = triples_table.into();
        self
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./tessera.db"),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
            cache_size: -16000,
            mmap_size: 0,
            documents_table: "documents".to_string(),
            triples_table: "triples".to_string(),
        }
    }
}
