//! Breadth-first path search
//!
//! Nodes are interned to dense `u32` ids so the visited set is a bit vector
//! and queued paths are parent links into an arena instead of cloned string
//! vectors.

use std::collections::{HashMap, VecDeque};

use rusqlite::Connection;
use tessera_config::SqlIdentifier;
use tracing::debug;

use super::{adjacent_nodes, Direction};
use crate::error::SqliteResult;

/// Search stops after this many complete paths
pub const MAX_PATHS: usize = 100;

const DEFAULT_MAX_DEPTH: usize = 10;

/// Dense node identifier handed out by [`NodeInterner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position in the interner
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Maps node names to dense ids and back
#[derive(Debug, Default)]
pub struct NodeInterner {
    ids: HashMap<String, NodeId>,
    names: Vec<String>,
}

impl NodeInterner {
    /// Empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, allocating one on first sight
    pub fn intern(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = NodeId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Id for `name` if it was interned
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    /// Name behind `id`
    pub fn resolve(&self, id: NodeId) -> &str {
        &self.names[id.index()]
    }

    /// Number of distinct nodes seen
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing was interned yet
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Default)]
struct VisitedSet {
    bits: Vec<u64>,
}

impl VisitedSet {
    /// Mark `id`; false if it was already marked
    fn insert(&mut self, id: NodeId) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let fresh = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        fresh
    }
}

/// Queued search state: a node and the arena slot of its predecessor
#[derive(Debug, Clone, Copy)]
struct Hop {
    node: NodeId,
    parent: Option<usize>,
    depth: usize,
}

pub(crate) fn breadth_first_paths(
    conn: &Connection,
    table: &SqlIdentifier,
    from: &str,
    to: &str,
    max_depth: i32,
    predicate: &str,
) -> SqliteResult<Vec<Vec<String>>> {
    let max_depth = usize::try_from(max_depth)
        .ok()
        .filter(|&d| d > 0)
        .unwrap_or(DEFAULT_MAX_DEPTH);

    let mut interner = NodeInterner::new();
    let mut visited = VisitedSet::default();
    let mut arena: Vec<Hop> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();
    let mut paths: Vec<Vec<String>> = Vec::new();

    let source = interner.intern(from);
    let target = interner.intern(to);
    visited.insert(source);
    arena.push(Hop {
        node: source,
        parent: None,
        depth: 0,
    });
    queue.push_back(0);

    while let Some(slot) = queue.pop_front() {
        let hop = arena[slot];
        if hop.depth >= max_depth {
            continue;
        }

        let current = interner.resolve(hop.node).to_string();
        for name in adjacent_nodes(conn, table, &current, predicate, Direction::Out)? {
            let next = interner.intern(&name);

            // The target is recorded, never expanded, so other predecessors
            // can still reach it
            if next == target {
                paths.push(reconstruct(&arena, &interner, slot, target));
                if paths.len() >= MAX_PATHS {
                    debug!(paths = paths.len(), "Path limit reached");
                    return Ok(paths);
                }
                continue;
            }

            if visited.insert(next) {
                arena.push(Hop {
                    node: next,
                    parent: Some(slot),
                    depth: hop.depth + 1,
                });
                queue.push_back(arena.len() - 1);
            }
        }
    }

    debug!(paths = paths.len(), explored = interner.len(), "Path search finished");
    Ok(paths)
}

fn reconstruct(arena: &[Hop], interner: &NodeInterner, slot: usize, target: NodeId) -> Vec<String> {
    let mut reversed = vec![target];
    let mut cursor = Some(slot);
    while let Some(index) = cursor {
        reversed.push(arena[index].node);
        cursor = arena[index].parent;
    }
    reversed
        .into_iter()
        .rev()
        .map(|id| interner.resolve(id).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqlitePool;
    use crate::graph::TripleStore;

    #[test]
    fn interner_round_trips() {
        let mut interner = NodeInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        assert_eq!(interner.intern("a"), a);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(b), "b");
        assert_eq!(interner.get("c"), None);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn visited_set_grows() {
        let mut visited = VisitedSet::default();
        assert!(visited.insert(NodeId(200)));
        assert!(!visited.insert(NodeId(200)));
        assert!(visited.insert(NodeId(3)));
    }

    async fn store(edges: &[(&str, &str, &str)]) -> TripleStore {
        let store = TripleStore::new(SqlitePool::memory().unwrap());
        for (s, p, o) in edges {
            store.link(s, p, o).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn related_chain() {
        let store = store(&[("doc1", "related", "doc2"), ("doc2", "related", "doc3")]).await;
        let paths = store.find_path("doc1", "doc3", 5, "related").await.unwrap();
        assert_eq!(paths, vec![vec!["doc1", "doc2", "doc3"]]);
    }

    #[tokio::test]
    async fn self_path_ignores_depth_and_predicate() {
        let store = store(&[]).await;
        for depth in [-1, 0, 3] {
            let paths = store.find_path("a", "a", depth, "anything").await.unwrap();
            assert_eq!(paths, vec![vec!["a"]]);
        }
    }

    #[tokio::test]
    async fn shorter_paths_come_first() {
        let store = store(&[
            ("a", "r", "b"),
            ("b", "r", "d"),
            ("a", "r", "d"),
            ("a", "r", "c"),
            ("c", "r", "d"),
        ])
        .await;
        let paths = store.find_path("a", "d", 0, "").await.unwrap();
        assert_eq!(
            paths,
            vec![
                vec!["a", "d"],
                vec!["a", "b", "d"],
                vec!["a", "c", "d"],
            ]
        );
    }

    #[tokio::test]
    async fn respects_max_depth_and_predicate() {
        let store = store(&[
            ("a", "r", "b"),
            ("b", "r", "c"),
            ("c", "r", "d"),
            ("a", "x", "d"),
        ])
        .await;

        assert!(store.find_path("a", "d", 2, "r").await.unwrap().is_empty());
        assert_eq!(
            store.find_path("a", "d", 3, "r").await.unwrap(),
            vec![vec!["a", "b", "c", "d"]]
        );
        assert_eq!(
            store.find_path("a", "d", 3, "").await.unwrap()[0],
            vec!["a", "d"]
        );
    }

    #[tokio::test]
    async fn cycles_terminate() {
        let store = store(&[("a", "r", "b"), ("b", "r", "a"), ("b", "r", "b")]).await;
        assert!(store.find_path("a", "z", 0, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stops_at_path_limit() {
        // 150 parallel two-hop routes from s to t
        let store = store(&[]).await;
        for i in 0..150 {
            let mid = format!("m{i:03}");
            store.link("s", "r", &mid).await.unwrap();
            store.link(&mid, "r", "t").await.unwrap();
        }
        let paths = store.find_path("s", "t", 0, "r").await.unwrap();
        assert_eq!(paths.len(), MAX_PATHS);
        assert!(paths.iter().all(|p| p.len() == 3));
    }
}
