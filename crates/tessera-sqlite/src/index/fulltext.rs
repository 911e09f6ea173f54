//! Keyword search by substring matching
//!
//! Query tokens are the whitespace-separated tokens of the lower-cased
//! query (after the store's tokenizer, if any), repeats included. A
//! document's score is matched tokens over total query tokens, so a repeated
//! token weighs once per occurrence and under [`MatchPolicy::All`] every hit
//! scores 1.0.

use tessera_config::MatchPolicy;
use tessera_core::tokenizer::query_tokens;
use tessera_core::{QueryResult, TesseraResult};
use tracing::debug;

use crate::document_store::DocumentStore;

/// Substring search over stored search text
#[derive(Debug, Clone)]
pub struct FulltextIndex {
    documents: DocumentStore,
    policy: MatchPolicy,
}

impl FulltextIndex {
    /// Index requiring every term to match
    pub fn new(documents: DocumentStore) -> Self {
        Self {
            documents,
            policy: MatchPolicy::All,
        }
    }

    /// Builder-style: choose AND or OR matching
    #[must_use]
    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Matching policy in use
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Top `limit` documents containing the query terms
    pub async fn search(&self, query: &str, limit: usize) -> TesseraResult<Vec<QueryResult>> {
        let terms = query_tokens(self.documents.tokenizer(), query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let total = terms.len() as f64;
        let matches = self
            .documents
            .search_text_matches(&terms, self.policy, limit)
            .await?;
        debug!(terms = terms.len(), hits = matches.len(), policy = ?self.policy, "Fulltext search");

        Ok(matches
            .into_iter()
            .map(|m| QueryResult {
                score: m.matched as f64 / total,
                ..m.hit
            })
            .collect())
    }
}
