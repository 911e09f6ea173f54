//! Schema management and migrations
//!
//! Table names come from configuration, so every DDL and DML string that
//! names a table is built from a [`TableNames`], whose identifiers have
//! already passed the identifier grammar. Values are always bound.

use crate::error::{SqliteError, SqliteResult};
use rusqlite::{params, Connection, OptionalExtension};
use tessera_config::{SqlIdentifier, StorageConfig};
use tracing::{debug, info};

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 1;

/// Validated names of the two tables the engine owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Document rows
    pub documents: SqlIdentifier,
    /// Graph edges
    pub triples: SqlIdentifier,
}

impl TableNames {
    /// Validate the names in `config`
    pub fn from_config(config: &StorageConfig) -> SqliteResult<Self> {
        let documents = SqlIdentifier::parse(&config.documents_table)?;
        let triples = SqlIdentifier::parse(&config.triples_table)?;
        if documents == triples {
            return Err(SqliteError::Schema(format!(
                "documents and triples tables must differ (both '{documents}')"
            )));
        }
        Ok(Self { documents, triples })
    }

    fn scope(&self) -> String {
        format!("{}:{}", self.documents, self.triples)
    }
}

/// Apply all pending migrations for `tables`
pub fn apply_migrations(conn: &Connection, tables: &TableNames) -> SqliteResult<()> {
    // One row per (version, table set) so stores with different table names
    // can share a database file
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER NOT NULL,
            scope TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (version, scope)
        );",
    )?;

    let scope = tables.scope();
    let current_version = get_current_version(conn, &scope)?;
    debug!(current_version, target_version = SCHEMA_VERSION, %scope, "Checking migrations");

    if current_version < SCHEMA_VERSION {
        info!(
            from = current_version,
            to = SCHEMA_VERSION,
            %scope,
            "Applying schema migrations"
        );
        apply_migration_v1(conn, tables)?;
    }

    Ok(())
}

/// Get current schema version for a table set
fn get_current_version(conn: &Connection, scope: &str) -> SqliteResult<i32> {
    let version: Option<i32> = conn
        .query_row(
            "SELECT MAX(version) FROM schema_migrations WHERE scope = ?1",
            [scope],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, version: i32, scope: &str) -> SqliteResult<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, scope) VALUES (?1, ?2)",
        params![version, scope],
    )?;
    Ok(())
}

/// Migration v1: documents and triples
fn apply_migration_v1(conn: &Connection, tables: &TableNames) -> SqliteResult<()> {
    debug!("Applying migration v1: documents + triples");

    conn.execute_batch(&schema_v1(tables))
        .map_err(|e| SqliteError::Schema(format!("Failed to apply v1 schema: {e}")))?;

    record_migration(conn, 1, &tables.scope())?;
    info!("Migration v1 applied successfully");
    Ok(())
}

fn schema_v1(tables: &TableNames) -> String {
    let docs = &tables.documents;
    let triples = &tables.triples;
    format!(
        r#"
-- Documents: content, opaque metadata, embedding and its lifecycle.
-- search_text holds the lower-cased (optionally tokenized) content used for
-- substring matching.
CREATE TABLE IF NOT EXISTS {docs} (
    id TEXT PRIMARY KEY NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    search_text TEXT NOT NULL DEFAULT '',
    metadata TEXT NOT NULL DEFAULT '{{}}',  -- JSON object
    vector BLOB,                            -- little-endian f32
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
    revision INTEGER NOT NULL DEFAULT 1,
    last_error TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{docs}_status ON {docs}(status, updated_at);

-- Triples: directed labelled edges, unique per (subject, predicate, object)
CREATE TABLE IF NOT EXISTS {triples} (
    subject TEXT NOT NULL,
    predicate TEXT NOT NULL,
    object TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (subject, predicate, object)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_{triples}_object ON {triples}(object, predicate);
CREATE INDEX IF NOT EXISTS idx_{triples}_predicate ON {triples}(predicate);
"#
    )
}
