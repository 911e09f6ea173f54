//! Triple store: schema-less directed graph of `(subject, predicate, object)`
//!
//! Writes go through [`RetryPolicy`] so lock contention from other writers is
//! absorbed with backoff. Reads are single statements and are not retried.
//!
//! An empty predicate in a read means "any predicate".

mod path;
mod query;

pub use path::{NodeId, NodeInterner, MAX_PATHS};
pub use query::{Direction, Traversal};

use std::collections::BTreeSet;
use std::sync::Arc;

use rusqlite::{params, Connection, Row};
use tessera_config::SqlIdentifier;
use tessera_core::clock::system_clock;
use tessera_core::{
    CancellationToken, Clock, GraphError, RetryPolicy, TesseraResult, Triple,
};
use tracing::{debug, instrument};

use crate::connection::SqlitePool;
use crate::error::SqliteResult;
use crate::timestamp;

/// Graph store over the configured triples table
#[derive(Clone)]
pub struct TripleStore {
    pool: SqlitePool,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl TripleStore {
    /// Store with the default retry policy and wall-clock time
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
            clock: system_clock(),
        }
    }

    /// Builder-style: replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style: replace the clock used for backoff
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert an edge; linking an existing edge is a no-op
    pub async fn link(&self, subject: &str, predicate: &str, object: &str) -> TesseraResult<()> {
        self.link_with_cancel(&CancellationToken::new(), subject, predicate, object)
            .await
    }

    /// [`link`](Self::link), abandoning retries once `cancel` fires
    #[instrument(skip(self, cancel))]
    pub async fn link_with_cancel(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> TesseraResult<()> {
        let edge = EdgeKey::new(subject, predicate, object)?;

        let inserted = self
            .retry
            .run(self.clock.as_ref(), cancel, |_attempt| {
                let edge = edge.clone();
                self.pool.interact(move |conn, tables| {
                    insert_triple(
                        conn,
                        &tables.triples,
                        &edge.subject,
                        &edge.predicate,
                        &edge.object,
                        &timestamp::now(),
                    )
                })
            })
            .await?;

        if !inserted {
            debug!("Triple already present");
        }
        Ok(())
    }

    /// Remove an edge; removing an absent edge succeeds
    pub async fn unlink(&self, subject: &str, predicate: &str, object: &str) -> TesseraResult<()> {
        self.unlink_with_cancel(&CancellationToken::new(), subject, predicate, object)
            .await
    }

    /// [`unlink`](Self::unlink), abandoning retries once `cancel` fires
    #[instrument(skip(self, cancel))]
    pub async fn unlink_with_cancel(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> TesseraResult<()> {
        let edge = EdgeKey::new(subject, predicate, object)?;

        let removed = self
            .retry
            .run(self.clock.as_ref(), cancel, |_attempt| {
                let edge = edge.clone();
                self.pool.interact(move |conn, tables| {
                    let sql = format!(
                        "DELETE FROM {} WHERE subject = ?1 AND predicate = ?2 AND object = ?3",
                        tables.triples
                    );
                    let removed = conn.prepare_cached(&sql)?.execute(params![
                        edge.subject,
                        edge.predicate,
                        edge.object
                    ])?;
                    Ok(removed)
                })
            })
            .await?;

        debug!(removed, "Unlinked triple");
        Ok(())
    }

    /// Objects of edges leaving `node`
    pub async fn neighbors(&self, node: &str, predicate: &str) -> TesseraResult<BTreeSet<String>> {
        self.adjacent(node, predicate, Direction::Out).await
    }

    /// Subjects of edges arriving at `node`
    pub async fn in_neighbors(
        &self,
        node: &str,
        predicate: &str,
    ) -> TesseraResult<BTreeSet<String>> {
        self.adjacent(node, predicate, Direction::In).await
    }

    async fn adjacent(
        &self,
        node: &str,
        predicate: &str,
        direction: Direction,
    ) -> TesseraResult<BTreeSet<String>> {
        let node = node.to_string();
        let predicate = predicate.to_string();
        let nodes = self
            .pool
            .interact(move |conn, tables| {
                adjacent_nodes(conn, &tables.triples, &node, &predicate, direction)
            })
            .await?;
        Ok(nodes.into_iter().collect())
    }

    /// Edges matching a pattern; `None` matches anything
    pub async fn triples(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
    ) -> TesseraResult<Vec<Triple>> {
        let pattern = (
            subject.map(str::to_string),
            predicate.map(str::to_string),
            object.map(str::to_string),
        );
        let triples = self
            .pool
            .interact(move |conn, tables| {
                let sql = format!(
                    "SELECT subject, predicate, object, created_at FROM {}
                     WHERE (?1 IS NULL OR subject = ?1)
                       AND (?2 IS NULL OR predicate = ?2)
                       AND (?3 IS NULL OR object = ?3)
                     ORDER BY subject, predicate, object",
                    tables.triples
                );
                let mut stmt = conn.prepare_cached(&sql)?;
                let mut rows = stmt.query(params![pattern.0, pattern.1, pattern.2])?;
                let mut triples = Vec::new();
                while let Some(row) = rows.next()? {
                    triples.push(read_triple(row)?);
                }
                Ok(triples)
            })
            .await?;
        Ok(triples)
    }

    /// Total number of edges
    pub async fn count(&self) -> TesseraResult<u64> {
        let count = self
            .pool
            .interact(|conn, tables| {
                let n: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {}", tables.triples),
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Start a traversal
    pub fn query(&self) -> Traversal<'_> {
        Traversal::new(self)
    }

    /// Shortest-first simple paths from `from` to `to`
    ///
    /// Breadth-first over outgoing edges matching `predicate` (empty for
    /// any). `max_depth <= 0` means 10 hops. At most [`MAX_PATHS`] paths are
    /// returned, in discovery order.
    pub async fn find_path(
        &self,
        from: &str,
        to: &str,
        max_depth: i32,
        predicate: &str,
    ) -> TesseraResult<Vec<Vec<String>>> {
        if from == to {
            return Ok(vec![vec![from.to_string()]]);
        }
        let from = from.to_string();
        let to = to.to_string();
        let predicate = predicate.to_string();
        let paths = self
            .pool
            .interact(move |conn, tables| {
                path::breadth_first_paths(conn, &tables.triples, &from, &to, max_depth, &predicate)
            })
            .await?;
        Ok(paths)
    }
}

impl std::fmt::Debug for TripleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripleStore")
            .field("pool", &self.pool)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct EdgeKey {
    subject: String,
    predicate: String,
    object: String,
}

impl EdgeKey {
    fn new(subject: &str, predicate: &str, object: &str) -> Result<Self, GraphError> {
        for (name, value) in [
            ("subject", subject),
            ("predicate", predicate),
            ("object", object),
        ] {
            if value.is_empty() {
                return Err(GraphError::InvalidArgument(format!("{name} is empty")));
            }
        }
        Ok(Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
        })
    }
}

/// `INSERT OR IGNORE` one edge; true if a row was added
pub(crate) fn insert_triple(
    conn: &Connection,
    table: &SqlIdentifier,
    subject: &str,
    predicate: &str,
    object: &str,
    created_at: &str,
) -> SqliteResult<bool> {
    let sql = format!(
        "INSERT OR IGNORE INTO {table} (subject, predicate, object, created_at)
         VALUES (?1, ?2, ?3, ?4)"
    );
    let inserted = conn
        .prepare_cached(&sql)?
        .execute(params![subject, predicate, object, created_at])?;
    Ok(inserted > 0)
}

/// Distinct nodes one hop from `node`, sorted
pub(crate) fn adjacent_nodes(
    conn: &Connection,
    table: &SqlIdentifier,
    node: &str,
    predicate: &str,
    direction: Direction,
) -> SqliteResult<Vec<String>> {
    let (key, other) = match direction {
        Direction::Out => ("subject", "object"),
        Direction::In => ("object", "subject"),
        Direction::Both => {
            let mut nodes = adjacent_nodes(conn, table, node, predicate, Direction::Out)?;
            nodes.extend(adjacent_nodes(conn, table, node, predicate, Direction::In)?);
            nodes.sort();
            nodes.dedup();
            return Ok(nodes);
        }
    };
    let sql = format!(
        "SELECT DISTINCT {other} FROM {table}
         WHERE {key} = ?1 AND (?2 = '' OR predicate = ?2)
         ORDER BY {other}"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![node, predicate], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Edges touching `node` in `direction`, sorted
pub(crate) fn adjacent_edges(
    conn: &Connection,
    table: &SqlIdentifier,
    node: &str,
    predicate: &str,
    direction: Direction,
) -> SqliteResult<Vec<Triple>> {
    let key = match direction {
        Direction::Out => "subject",
        Direction::In => "object",
        Direction::Both => {
            let mut edges = adjacent_edges(conn, table, node, predicate, Direction::Out)?;
            for edge in adjacent_edges(conn, table, node, predicate, Direction::In)? {
                // Self-loops show up in both directions
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
            return Ok(edges);
        }
    };
    let sql = format!(
        "SELECT subject, predicate, object, created_at FROM {table}
         WHERE {key} = ?1 AND (?2 = '' OR predicate = ?2)
         ORDER BY subject, predicate, object"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut rows = stmt.query(params![node, predicate])?;
    let mut edges = Vec::new();
    while let Some(row) = rows.next()? {
        edges.push(read_triple(row)?);
    }
    Ok(edges)
}

fn read_triple(row: &Row<'_>) -> SqliteResult<Triple> {
    let created_at: String = row.get(3)?;
    Ok(Triple {
        subject: row.get(0)?,
        predicate: row.get(1)?,
        object: row.get(2)?,
        created_at: timestamp::decode(&created_at)?,
    })
}
