//! Weighted score fusion for hybrid retrieval
//!
//! A document found by both strategies scores
//! `vector_weight * vector_score + fulltext_weight * fulltext_score`; a
//! document found by one scores that strategy's weight times its own score.

use std::cmp::Ordering;
use std::collections::HashMap;

use tessera_config::RetrievalConfig;

use crate::types::QueryResult;

/// Per-strategy weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    /// Applied to vector similarity
    pub vector: f64,
    /// Applied to full-text relevance
    pub fulltext: f64,
}

impl FusionWeights {
    /// Explicit weights
    pub fn new(vector: f64, fulltext: f64) -> Self {
        Self { vector, fulltext }
    }

    /// Weights from retrieval configuration
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.vector_weight, config.fulltext_weight)
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self::new(0.6, 0.4)
    }
}

/// Order results by score descending, then id ascending
pub fn sort_by_score(results: &mut [QueryResult]) {
    results.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });
}

/// Merge two ranked lists by document id, re-score, sort and truncate
pub fn fuse(
    vector: Vec<QueryResult>,
    fulltext: Vec<QueryResult>,
    weights: FusionWeights,
    limit: usize,
) -> Vec<QueryResult> {
    let mut merged: HashMap<String, QueryResult> = HashMap::with_capacity(vector.len());

    for mut hit in vector {
        hit.score *= weights.vector;
        merged.insert(hit.id.clone(), hit);
    }

    for hit in fulltext {
        let weighted = hit.score * weights.fulltext;
        merged
            .entry(hit.id.clone())
            .and_modify(|existing| existing.score += weighted)
            .or_insert(QueryResult {
                score: weighted,
                ..hit
            });
    }

    let mut results: Vec<QueryResult> = merged.into_values().collect();
    sort_by_score(&mut results);
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn hit(id: &str, score: f64) -> QueryResult {
        QueryResult {
            id: id.to_string(),
            content: format!("content of {id}"),
            metadata: Map::new(),
            score,
        }
    }

    fn score_of(results: &[QueryResult], id: &str) -> f64 {
        results.iter().find(|r| r.id == id).map(|r| r.score).unwrap()
    }

    #[test]
    fn document_in_both_lists_combines_weights() {
        let results = fuse(
            vec![hit("a", 0.9)],
            vec![hit("a", 0.5)],
            FusionWeights::default(),
            10,
        );
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 0.74).abs() < 1e-12);
    }

    #[test]
    fn single_source_documents_keep_their_weight() {
        let results = fuse(
            vec![hit("v", 0.8)],
            vec![hit("f", 1.0)],
            FusionWeights::default(),
            10,
        );
        assert!((score_of(&results, "v") - 0.48).abs() < 1e-12);
        assert!((score_of(&results, "f") - 0.4).abs() < 1e-12);
        assert_eq!(results[0].id, "v");
    }

    #[test]
    fn sorted_descending_and_truncated() {
        let results = fuse(
            vec![hit("a", 0.2), hit("b", 0.9), hit("c", 0.5)],
            vec![hit("c", 1.0)],
            FusionWeights::default(),
            2,
        );
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        // c = 0.3 + 0.4 = 0.7, b = 0.54, a = 0.12
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn ties_break_by_id() {
        let results = fuse(
            vec![],
            vec![hit("zeta", 1.0), hit("alpha", 1.0), hit("mid", 1.0)],
            FusionWeights::default(),
            10,
        );
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn empty_inputs_fuse_to_nothing() {
        assert!(fuse(vec![], vec![], FusionWeights::default(), 10).is_empty());
        assert!(fuse(vec![hit("a", 1.0)], vec![], FusionWeights::default(), 0).is_empty());
    }

    #[test]
    fn weights_come_from_config() {
        let config = RetrievalConfig {
            vector_weight: 0.3,
            fulltext_weight: 0.7,
            ..RetrievalConfig::default()
        };
        assert_eq!(FusionWeights::from_config(&config), FusionWeights::new(0.3, 0.7));
    }
}
