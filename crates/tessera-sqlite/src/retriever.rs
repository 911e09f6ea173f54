//! Mode dispatch and hybrid fusion
//!
//! Single modes propagate their index's error. Hybrid runs vector and
//! full-text search concurrently with `candidate_multiplier * limit`
//! candidates each and fuses whatever came back; under
//! [`HybridPolicy::BestEffort`] a failing side is reported in
//! [`RetrievalOutcome::partial_errors`] instead of failing the call.

use std::sync::Arc;

use tessera_config::{HybridPolicy, RetrievalConfig};
use tessera_core::embedding::embed_one;
use tessera_core::{
    fuse, EmbeddingProvider, FusionWeights, QueryResult, RetrievalMode, TesseraError,
    TesseraResult,
};
use tracing::{debug, instrument, warn};

use crate::index::{FulltextIndex, GraphIndex, VectorIndex};

/// A sub-search that failed during hybrid retrieval
#[derive(Debug)]
pub struct PartialFailure {
    /// Which strategy failed
    pub mode: RetrievalMode,
    /// Why
    pub error: TesseraError,
}

/// Ranked results plus any tolerated sub-search failures
#[derive(Debug, Default)]
pub struct RetrievalOutcome {
    /// Ranked, truncated results
    pub results: Vec<QueryResult>,
    /// Failures absorbed under best-effort hybrid retrieval
    pub partial_errors: Vec<PartialFailure>,
}

impl RetrievalOutcome {
    fn complete(results: Vec<QueryResult>) -> Self {
        Self {
            results,
            partial_errors: Vec::new(),
        }
    }

    /// Whether some strategy failed
    pub fn is_partial(&self) -> bool {
        !self.partial_errors.is_empty()
    }

    /// Results, failing if any strategy failed
    pub fn into_strict(self) -> TesseraResult<Vec<QueryResult>> {
        match self.partial_errors.into_iter().next() {
            Some(failure) => Err(failure.error),
            None => Ok(self.results),
        }
    }
}

/// Orchestrates the three indexes
#[derive(Clone)]
pub struct HybridRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    vector: VectorIndex,
    fulltext: FulltextIndex,
    graph: GraphIndex,
    config: RetrievalConfig,
}

impl HybridRetriever {
    /// Retriever over the given indexes
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector: VectorIndex,
        fulltext: FulltextIndex,
        graph: GraphIndex,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            vector,
            fulltext,
            graph,
            config,
        }
    }

    /// Retrieval settings
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Parse `mode` (or use the configured default) and retrieve
    pub async fn retrieve_str(
        &self,
        query: &str,
        mode: Option<&str>,
        limit: usize,
    ) -> TesseraResult<RetrievalOutcome> {
        let mode: RetrievalMode = mode.unwrap_or(self.config.default_mode.as_str()).parse()?;
        self.retrieve(query, mode, limit).await
    }

    /// Retrieve up to `limit` results using `mode`
    #[instrument(skip(self), fields(model = self.embedder.model()))]
    pub async fn retrieve(
        &self,
        query: &str,
        mode: RetrievalMode,
        limit: usize,
    ) -> TesseraResult<RetrievalOutcome> {
        if limit == 0 {
            return Ok(RetrievalOutcome::default());
        }

        let outcome = match mode {
            RetrievalMode::Vector => {
                RetrievalOutcome::complete(self.vector_search(query, limit).await?)
            }
            RetrievalMode::Fulltext => {
                RetrievalOutcome::complete(self.fulltext.search(query, limit).await?)
            }
            RetrievalMode::Graph => RetrievalOutcome::complete(self.graph.search(query, limit).await?),
            RetrievalMode::Hybrid => self.hybrid(query, limit).await?,
        };

        debug!(
            %mode,
            results = outcome.results.len(),
            partial = outcome.is_partial(),
            "Retrieval finished"
        );
        Ok(outcome)
    }

    async fn vector_search(&self, query: &str, limit: usize) -> TesseraResult<Vec<QueryResult>> {
        let embedding = embed_one(self.embedder.as_ref(), query).await?;
        self.vector.search(&embedding, limit, None).await
    }

    async fn hybrid(&self, query: &str, limit: usize) -> TesseraResult<RetrievalOutcome> {
        let candidates = limit.saturating_mul(self.config.candidate_multiplier.max(1));

        let (vector, fulltext) = tokio::join!(
            self.vector_search(query, candidates),
            self.fulltext.search(query, candidates),
        );

        let mut partial_errors = Vec::new();
        let vector = self.tolerate(RetrievalMode::Vector, vector, &mut partial_errors)?;
        let fulltext = self.tolerate(RetrievalMode::Fulltext, fulltext, &mut partial_errors)?;

        let weights = FusionWeights::from_config(&self.config);
        Ok(RetrievalOutcome {
            results: fuse(vector, fulltext, weights, limit),
            partial_errors,
        })
    }

    fn tolerate(
        &self,
        mode: RetrievalMode,
        result: TesseraResult<Vec<QueryResult>>,
        partial_errors: &mut Vec<PartialFailure>,
    ) -> TesseraResult<Vec<QueryResult>> {
        match (result, self.config.hybrid_policy) {
            (Ok(hits), _) => Ok(hits),
            (Err(error), HybridPolicy::Strict) => Err(error),
            (Err(error), HybridPolicy::BestEffort) => {
                warn!(%mode, %error, "Hybrid sub-search failed, continuing without it");
                partial_errors.push(PartialFailure { mode, error });
                Ok(Vec::new())
            }
        }
    }
}

impl std::fmt::Debug for HybridRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRetriever")
            .field("model", &self.embedder.model())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
