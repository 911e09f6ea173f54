//! Retrieval component configuration

use serde::{Deserialize, Serialize};

/// Keyword matching policy for full-text search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Every query token must occur (score is always 1.0)
    #[default]
    All,
    /// Any query token may occur (score is matched / total)
    Any,
}

/// How hybrid retrieval treats a failing sub-search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HybridPolicy {
    /// Keep whatever the other sub-search produced and report the failure
    #[default]
    BestEffort,
    /// Fail the whole retrieval
    Strict,
}

/// Retrieval and fusion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Mode used when a caller does not name one
    pub default_mode: String,
    /// Weight of the vector score in hybrid fusion
    pub vector_weight: f64,
    /// Weight of the full-text score in hybrid fusion
    pub fulltext_weight: f64,
    /// Each hybrid sub-search requests `limit * candidate_multiplier` rows
    pub candidate_multiplier: usize,
    /// Flat score assigned to every graph result
    pub graph_score: f64,
    /// Predicate followed when expanding graph seeds
    pub graph_predicate: String,
    /// Full-text matching policy
    pub fulltext_match: MatchPolicy,
    /// Error policy for hybrid mode
    pub hybrid_policy: HybridPolicy,
    /// Result limit used when a caller passes zero
    pub default_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_mode: "hybrid".to_string(),
            vector_weight: 0.6,
            fulltext_weight: 0.4,
            candidate_multiplier: 2,
            graph_score: 0.5,
            graph_predicate: "related".to_string(),
            fulltext_match: MatchPolicy::All,
            hybrid_policy: HybridPolicy::BestEffort,
            default_limit: 10,
        }
    }
}
