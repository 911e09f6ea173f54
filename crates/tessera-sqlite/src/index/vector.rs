//! Dense-vector similarity search

use tessera_core::{QueryResult, TesseraResult};
use tracing::debug;

use crate::document_store::DocumentStore;

/// Cosine-similarity search over `completed` documents
#[derive(Debug, Clone)]
pub struct VectorIndex {
    documents: DocumentStore,
}

impl VectorIndex {
    /// Index over `documents`
    pub fn new(documents: DocumentStore) -> Self {
        Self { documents }
    }

    /// Top `limit` documents by similarity to `query`
    ///
    /// A positive `threshold` drops documents less similar than it. Scores
    /// are raw cosine similarities.
    pub async fn search(
        &self,
        query: &[f32],
        limit: usize,
        threshold: Option<f32>,
    ) -> TesseraResult<Vec<QueryResult>> {
        let hits = self.documents.nearest(query, limit, threshold).await?;
        debug!(hits = hits.len(), limit, "Vector search");
        Ok(hits)
    }
}
