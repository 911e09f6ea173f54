//! Seed-and-expand search over the triple store
//!
//! Seeds are documents whose search text contains any query term; each seed
//! is expanded with its neighbors along one predicate ("related" by
//! default). Every result gets the same flat score: this strategy finds,
//! it does not rank.

use std::collections::HashSet;

use tessera_config::{MatchPolicy, RetrievalConfig};
use tessera_core::tokenizer::query_terms;
use tessera_core::{QueryResult, TesseraResult};
use tracing::debug;

use crate::document_store::DocumentStore;
use crate::graph::TripleStore;

const DEFAULT_PREDICATE: &str = "related";
const DEFAULT_SCORE: f64 = 0.5;

/// Graph-expansion search
#[derive(Debug, Clone)]
pub struct GraphIndex {
    documents: DocumentStore,
    triples: TripleStore,
    predicate: String,
    score: f64,
}

impl GraphIndex {
    /// Expand along "related" edges, scoring 0.5
    pub fn new(documents: DocumentStore, triples: TripleStore) -> Self {
        Self {
            documents,
            triples,
            predicate: DEFAULT_PREDICATE.to_string(),
            score: DEFAULT_SCORE,
        }
    }

    /// Predicate and score from configuration
    pub fn from_config(
        documents: DocumentStore,
        triples: TripleStore,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            predicate: config.graph_predicate.clone(),
            score: config.graph_score,
            ..Self::new(documents, triples)
        }
    }

    /// Seeds first, then their neighbors, deduplicated and capped at `limit`
    pub async fn search(&self, query: &str, limit: usize) -> TesseraResult<Vec<QueryResult>> {
        let terms = query_terms(self.documents.tokenizer(), query);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let seeds = self
            .documents
            .search_text_matches(&terms, MatchPolicy::Any, limit)
            .await?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut ids: Vec<String> = Vec::new();
        for seed in &seeds {
            if seen.insert(seed.hit.id.clone()) {
                ids.push(seed.hit.id.clone());
            }
        }
        for seed in &seeds {
            if ids.len() >= limit {
                break;
            }
            for neighbor in self.triples.neighbors(&seed.hit.id, &self.predicate).await? {
                if seen.insert(neighbor.clone()) {
                    ids.push(neighbor);
                }
            }
        }
        ids.truncate(limit);

        let documents = self.documents.get_many(&ids).await?;
        debug!(
            seeds = seeds.len(),
            expanded = ids.len(),
            found = documents.len(),
            "Graph search"
        );

        Ok(documents
            .into_iter()
            .map(|doc| doc.into_result(self.score))
            .collect())
    }
}
