//! `store` / `retrieve` facade for an orchestration layer
//!
//! Components are built on first use. Concurrent first calls share one
//! initialization: one pool is opened and migrated, the rest wait and then
//! see the ready components.

use std::sync::Arc;

use serde_json::{Map, Value};
use tessera_config::TesseraConfig;
use tessera_core::clock::system_clock;
use tessera_core::embedding::create_provider;
use tessera_core::{
    Clock, DocumentInput, EmbeddingProvider, RetryPolicy, TesseraResult, Tokenizer,
};
use tokio::sync::OnceCell;
use tracing::info;

use crate::connection::SqlitePool;
use crate::document_store::DocumentStore;
use crate::graph::TripleStore;
use crate::index::{FulltextIndex, GraphIndex, VectorIndex};
use crate::ingestion::IngestionPipeline;
use crate::retriever::{HybridRetriever, RetrievalOutcome};

/// Everything built by initialization
#[derive(Debug, Clone)]
pub struct Components {
    /// Shared connection
    pub pool: SqlitePool,
    /// Graph store
    pub triples: TripleStore,
    /// Document store
    pub documents: DocumentStore,
    /// Ingestion pipeline
    pub pipeline: IngestionPipeline,
    /// Retriever
    pub retriever: HybridRetriever,
}

/// Lazily initialized retrieval backend
pub struct RagStore {
    config: TesseraConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    clock: Arc<dyn Clock>,
    components: OnceCell<Components>,
}

impl RagStore {
    /// Backend using `embedder` and, optionally, `tokenizer`
    pub fn new(
        config: TesseraConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        tokenizer: Option<Arc<dyn Tokenizer>>,
    ) -> Self {
        Self {
            config,
            embedder,
            tokenizer,
            clock: system_clock(),
            components: OnceCell::new(),
        }
    }

    /// Backend whose embedding provider comes from `config.embedding`
    pub fn from_config(config: TesseraConfig) -> TesseraResult<Self> {
        let embedder = create_provider(&config.embedding)?;
        Ok(Self::new(config, embedder, None))
    }

    /// Builder-style: clock for retry backoff and rate limiting
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &TesseraConfig {
        &self.config
    }

    /// Whether initialization has completed
    pub fn is_initialized(&self) -> bool {
        self.components.initialized()
    }

    /// Open storage and build components, once
    pub async fn initialize(&self) -> TesseraResult<&Components> {
        self.components.get_or_try_init(|| self.build()).await
    }

    async fn build(&self) -> TesseraResult<Components> {
        self.config.validate()?;
        let pool = SqlitePool::open(self.config.storage.clone()).await?;

        let triples = TripleStore::new(pool.clone())
            .with_retry(RetryPolicy::from_config(&self.config.retry))
            .with_clock(self.clock.clone());

        let mut documents = DocumentStore::new(pool.clone());
        if let Some(tokenizer) = &self.tokenizer {
            documents = documents.with_tokenizer(tokenizer.clone());
        }

        let pipeline = IngestionPipeline::with_clock(
            documents.clone(),
            self.embedder.clone(),
            self.config.ingestion.clone(),
            self.clock.clone(),
        );

        let retrieval = &self.config.retrieval;
        let retriever = HybridRetriever::new(
            self.embedder.clone(),
            VectorIndex::new(documents.clone()),
            FulltextIndex::new(documents.clone()).with_policy(retrieval.fulltext_match),
            GraphIndex::from_config(documents.clone(), triples.clone(), retrieval),
            retrieval.clone(),
        );

        info!(path = ?self.config.storage.path, model = self.embedder.model(), "Storage initialized");
        Ok(Components {
            pool,
            triples,
            documents,
            pipeline,
            retriever,
        })
    }

    /// Validate and ingest open key-value documents
    ///
    /// Every document is validated before anything is stored.
    pub async fn store(&self, documents: Vec<Map<String, Value>>) -> TesseraResult<Vec<String>> {
        let inputs = documents
            .into_iter()
            .map(DocumentInput::from_map)
            .collect::<TesseraResult<Vec<_>>>()?;
        let components = self.initialize().await?;
        components.pipeline.insert_batch(inputs).await
    }

    /// Retrieve with `mode` (configured default when `None`)
    pub async fn retrieve(
        &self,
        query: &str,
        mode: Option<&str>,
        limit: usize,
    ) -> TesseraResult<RetrievalOutcome> {
        let components = self.initialize().await?;
        components.retriever.retrieve_str(query, mode, limit).await
    }

    /// The graph store
    pub async fn triples(&self) -> TesseraResult<&TripleStore> {
        Ok(&self.initialize().await?.triples)
    }

    /// The ingestion pipeline
    pub async fn pipeline(&self) -> TesseraResult<&IngestionPipeline> {
        Ok(&self.initialize().await?.pipeline)
    }
}

impl std::fmt::Debug for RagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagStore")
            .field("storage", &self.config.storage.path)
            .field("model", &self.embedder.model())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
