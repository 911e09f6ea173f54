//! SQLite connection management
//!
//! Uses a simple Arc<Mutex<Connection>> instead of a pool crate. Every
//! connection gets the engine's pragmas, the `cosine_similarity` scalar
//! function and the schema for the configured tables.

use crate::error::{SqliteError, SqliteResult};
use crate::schema::{self, TableNames};
use parking_lot::Mutex;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::sync::Arc;
use tessera_config::StorageConfig;
use tessera_core::similarity::{cosine_similarity, decode_vector};
use tracing::{debug, info};

/// Thread-safe SQLite connection wrapper
///
/// For SQLite in WAL mode, we can have multiple readers but only one writer.
/// This simple wrapper uses a mutex for thread safety.
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
    config: StorageConfig,
    tables: TableNames,
}

impl SqlitePool {
    /// Open (or create) the database described by `config`
    pub fn new(config: StorageConfig) -> SqliteResult<Self> {
        let tables = TableNames::from_config(&config)?;
        info!(path = ?config.path, documents = %tables.documents, triples = %tables.triples, "Creating SQLite connection");

        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SqliteError::Connection(format!("Failed to create directory: {e}"))
                })?;
            }
            Connection::open(&config.path)?
        };

        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
            tables,
        };
        pool.initialize()?;

        Ok(pool)
    }

    /// Create an in-memory pool for testing
    pub fn memory() -> SqliteResult<Self> {
        Self::new(StorageConfig::memory())
    }

    /// Open on a blocking thread
    pub async fn open(config: StorageConfig) -> SqliteResult<Self> {
        tokio::task::spawn_blocking(move || Self::new(config))
            .await
            .map_err(|e| SqliteError::Task(e.to_string()))?
    }

    /// Validated table names
    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Configuration this pool was opened with
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Execute a closure with the connection
    pub fn with_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Execute a closure with mutable access to the connection
    pub fn with_connection_mut<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T>,
    {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    /// Run `f` against the connection on tokio's blocking pool
    pub async fn interact<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&mut Connection, &TableNames) -> SqliteResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || {
            let tables = pool.tables.clone();
            pool.with_connection_mut(|conn| f(conn, &tables))
        })
        .await
        .map_err(|e| SqliteError::Task(e.to_string()))?
    }

    /// Initialize the database (configure pragmas, functions and schema)
    fn initialize(&self) -> SqliteResult<()> {
        self.with_connection(|conn| {
            self.configure_pragmas(conn)?;
            register_functions(conn)?;
            schema::apply_migrations(conn, &self.tables)?;

            info!("SQLite database initialized successfully");
            Ok(())
        })
    }

    /// Configure SQLite PRAGMA settings
    fn configure_pragmas(&self, conn: &Connection) -> SqliteResult<()> {
        debug!("Configuring SQLite pragmas");

        // WAL does not apply to in-memory databases
        if self.config.wal_mode && !self.config.is_memory() {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }

        if self.config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }

        conn.busy_timeout(std::time::Duration::from_millis(u64::from(
            self.config.busy_timeout_ms,
        )))?;

        conn.execute_batch(&format!("PRAGMA cache_size = {};", self.config.cache_size))?;

        if self.config.mmap_size > 0 {
            conn.execute_batch(&format!("PRAGMA mmap_size = {};", self.config.mmap_size))?;
        }

        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;

        Ok(())
    }
}

impl std::fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePool")
            .field("path", &self.config.path)
            .field("tables", &self.tables)
            .finish_non_exhaustive()
    }
}

/// Register `cosine_similarity(blob, blob) -> real`
///
/// NULL in, NULL out. Blobs must hold little-endian f32s; vectors of
/// different lengths score 0.
pub fn register_functions(conn: &Connection) -> SqliteResult<()> {
    conn.create_scalar_function(
        "cosine_similarity",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let (Some(a), Some(b)) = (vector_arg(ctx, 0)?, vector_arg(ctx, 1)?) else {
                return Ok(None);
            };
            Ok(Some(cosine_similarity(&a, &b)))
        },
    )?;
    Ok(())
}

fn vector_arg(ctx: &Context<'_>, idx: usize) -> rusqlite::Result<Option<Vec<f32>>> {
    match ctx.get_raw(idx) {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(bytes) => decode_vector(bytes).map(Some).ok_or_else(|| {
            rusqlite::Error::UserFunctionError("vector blob length is not a multiple of 4".into())
        }),
        _ => Err(rusqlite::Error::UserFunctionError(
            "cosine_similarity expects BLOB arguments".into(),
        )),
    }
}
