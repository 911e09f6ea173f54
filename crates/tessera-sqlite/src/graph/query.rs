//! Chainable traversal builder
//!
//! ```rust,ignore
//! let reachable = store.query().v("A").out("next").out("next").values().await?;
//! ```
//!
//! Steps are recorded lazily and executed in one blocking call when a
//! terminal (`values`/`all`) is awaited. Each step replaces the frontier with
//! the deduplicated next-hop nodes.

use std::collections::BTreeSet;

use tessera_core::{GraphError, TesseraResult, Triple};

use super::{adjacent_edges, TripleStore};
use crate::error::SqliteResult;

/// Edge direction for one hop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow edges from subject to object
    Out,
    /// Follow edges from object to subject
    In,
    /// Union of `Out` and `In`
    Both,
}

#[derive(Debug, Clone)]
struct Step {
    direction: Direction,
    predicate: String,
}

/// A pending traversal over a [`TripleStore`]
#[derive(Debug, Clone)]
pub struct Traversal<'a> {
    store: &'a TripleStore,
    start: Option<String>,
    steps: Vec<Step>,
}

impl<'a> Traversal<'a> {
    pub(crate) fn new(store: &'a TripleStore) -> Self {
        Self {
            store,
            start: None,
            steps: Vec::new(),
        }
    }

    /// Set the start node; the frontier becomes `{node}`
    #[must_use]
    pub fn v(mut self, node: impl Into<String>) -> Self {
        self.start = Some(node.into());
        self
    }

    /// Follow outgoing edges labelled `predicate` (empty for any)
    #[must_use]
    pub fn out(self, predicate: impl Into<String>) -> Self {
        self.step(Direction::Out, predicate)
    }

    /// Follow incoming edges labelled `predicate` (empty for any)
    #[must_use]
    pub fn in_(self, predicate: impl Into<String>) -> Self {
        self.step(Direction::In, predicate)
    }

    /// Follow edges in either direction
    #[must_use]
    pub fn both(self, predicate: impl Into<String>) -> Self {
        self.step(Direction::Both, predicate)
    }

    fn step(mut self, direction: Direction, predicate: impl Into<String>) -> Self {
        self.steps.push(Step {
            direction,
            predicate: predicate.into(),
        });
        self
    }

    /// Run every step and return the final frontier, sorted
    pub async fn values(self) -> TesseraResult<Vec<String>> {
        let (frontier, _) = self.execute().await?;
        Ok(frontier.into_iter().collect())
    }

    /// Run every step and return the edges crossed by the last one
    pub async fn all(self) -> TesseraResult<Vec<Triple>> {
        let (_, edges) = self.execute().await?;
        Ok(edges)
    }

    async fn execute(self) -> TesseraResult<(BTreeSet<String>, Vec<Triple>)> {
        let start = self.start.ok_or(GraphError::MissingStart)?;
        let steps = self.steps;
        let result = self
            .store
            .pool()
            .interact(move |conn, tables| {
                let mut frontier = BTreeSet::from([start]);
                let mut last_edges = Vec::new();
                for step in &steps {
                    let (next, edges) = expand(conn, &tables.triples, &frontier, step)?;
                    frontier = next;
                    last_edges = edges;
                }
                Ok((frontier, last_edges))
            })
            .await?;
        Ok(result)
    }
}

fn expand(
    conn: &rusqlite::Connection,
    table: &tessera_config::SqlIdentifier,
    frontier: &BTreeSet<String>,
    step: &Step,
) -> SqliteResult<(BTreeSet<String>, Vec<Triple>)> {
    let mut next = BTreeSet::new();
    let mut edges: Vec<Triple> = Vec::new();

    for node in frontier {
        for edge in adjacent_edges(conn, table, node, &step.predicate, step.direction)? {
            // The far end relative to the node we are standing on
            let far = if edge.subject == *node && step.direction != Direction::In {
                &edge.object
            } else {
                &edge.subject
            };
            next.insert(far.clone());
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
    }

    Ok((next, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqlitePool;

    async fn chain() -> TripleStore {
        let store = TripleStore::new(SqlitePool::memory().unwrap());
        store.link("A", "next", "B").await.unwrap();
        store.link("B", "next", "C").await.unwrap();
        store.link("C", "next", "D").await.unwrap();
        store.link("X", "other", "B").await.unwrap();
        store
    }

    #[tokio::test]
    async fn two_hops_out() {
        let store = chain().await;
        let values = store.query().v("A").out("next").out("next").values().await.unwrap();
        assert_eq!(values, vec!["C"]);
    }

    #[tokio::test]
    async fn in_then_out() {
        let store = chain().await;
        // Everything pointing at B, then everything those point at
        let values = store.query().v("B").in_("").out("").values().await.unwrap();
        assert_eq!(values, vec!["B"]);
        let sources = store.query().v("B").in_("").values().await.unwrap();
        assert_eq!(sources, vec!["A", "X"]);
    }

    #[tokio::test]
    async fn both_is_union_of_directions() {
        let store = chain().await;
        let values = store.query().v("B").both("next").values().await.unwrap();
        assert_eq!(values, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn all_returns_only_last_step_edges() {
        let store = chain().await;
        let edges = store.query().v("A").out("next").out("next").all().await.unwrap();
        assert_eq!(edges.len(), 1);
        assert!(edges[0].matches("B", "next", "C"));
    }

    #[tokio::test]
    async fn no_steps() {
        let store = chain().await;
        assert_eq!(store.query().v("A").values().await.unwrap(), vec!["A"]);
        assert!(store.query().v("A").all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_start_is_an_error() {
        let store = chain().await;
        let err = store.query().out("next").values().await.unwrap_err();
        assert!(matches!(
            err,
            tessera_core::TesseraError::Graph(GraphError::MissingStart)
        ));
        assert!(store.query().all().await.is_err());
    }

    #[tokio::test]
    async fn dead_end_empties_frontier() {
        let store = chain().await;
        let values = store.query().v("D").out("next").out("next").values().await.unwrap();
        assert!(values.is_empty());
    }
}
