//! Ingestion: embedding, status transitions and graph registration
//!
//! Two paths:
//!
//! - [`IngestionPipeline::insert_batch`] embeds inline, chunk by chunk, and
//!   stores each chunk in its own transaction. A failing chunk stops the
//!   call; earlier chunks stay committed and are reported through
//!   [`TesseraError::PartialIngest`].
//! - [`IngestionPipeline::insert_pending`] stores rows as `pending`;
//!   [`IngestionPipeline::process_pending_embeddings`] later drains them
//!   through the rate limiter. Only one drain runs at a time; a drain
//!   requested while another is in flight returns immediately. Rows a pass
//!   claimed but never finished (the pass was dropped or hit a storage
//!   error) become claimable again once `processing_lease_secs` elapses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tessera_config::IngestionConfig;
use tessera_core::clock::system_clock;
use tessera_core::embedding::{embed_exact, embed_one};
use tessera_core::{
    Clock, DocumentInput, EmbeddingProvider, RateLimiter, TesseraError, TesseraResult,
};
use tracing::{debug, info, instrument, warn};

use crate::document_store::{DocumentStore, DocumentWrite};

/// Outcome of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Rows moved from `pending` to `processing`
    pub claimed: usize,
    /// Rows that ended `completed`
    pub completed: usize,
    /// Rows that ended `failed`
    pub failed: usize,
    /// Another drain was already running; nothing was done
    pub skipped: bool,
}

impl DrainReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Clears the drain flag when the pass ends, however it ends
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives documents from input to embedded, graph-addressable rows
#[derive(Clone)]
pub struct IngestionPipeline {
    documents: DocumentStore,
    embedder: Arc<dyn EmbeddingProvider>,
    limiter: RateLimiter,
    config: IngestionConfig,
    draining: Arc<AtomicBool>,
}

impl IngestionPipeline {
    /// Pipeline limited to `config.embed_requests_per_second` on wall-clock time
    pub fn new(
        documents: DocumentStore,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IngestionConfig,
    ) -> Self {
        Self::with_clock(documents, embedder, config, system_clock())
    }

    /// Pipeline whose rate limiter runs on `clock`
    pub fn with_clock(
        documents: DocumentStore,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IngestionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = RateLimiter::per_second(config.embed_requests_per_second, clock);
        Self {
            documents,
            embedder,
            limiter,
            config,
            draining: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Store the pipeline writes to
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Whether a drain pass is running
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Embed and store `docs` in chunks of `batch_size`
    ///
    /// Returns the stored ids in input order. Empty-content documents are
    /// stored without a vector and never sent to the provider.
    #[instrument(skip(self, docs), fields(count = docs.len()))]
    pub async fn insert_batch(&self, docs: Vec<DocumentInput>) -> TesseraResult<Vec<String>> {
        for doc in &docs {
            doc.validate()?;
        }

        let batch_size = self.config.batch_size.max(1);
        let mut committed: Vec<String> = Vec::with_capacity(docs.len());
        let mut remaining = docs.into_iter().peekable();
        let mut chunk_index = 0usize;

        while remaining.peek().is_some() {
            let chunk: Vec<DocumentInput> = remaining.by_ref().take(batch_size).collect();
            chunk_index += 1;

            match self.store_chunk(chunk).await {
                Ok(ids) => {
                    debug!(chunk = chunk_index, stored = ids.len(), "Chunk committed");
                    committed.extend(ids);
                }
                Err(err) if committed.is_empty() => return Err(err),
                Err(err) => {
                    warn!(
                        chunk = chunk_index,
                        committed = committed.len(),
                        error = %err,
                        "Ingestion stopped part-way"
                    );
                    return Err(TesseraError::PartialIngest {
                        committed,
                        source: Box::new(err),
                    });
                }
            }
        }

        info!(stored = committed.len(), "Ingestion complete");
        Ok(committed)
    }

    async fn store_chunk(&self, chunk: Vec<DocumentInput>) -> TesseraResult<Vec<String>> {
        let texts: Vec<String> = chunk
            .iter()
            .filter(|doc| doc.has_content())
            .map(|doc| doc.content.clone())
            .collect();

        let mut vectors = if texts.is_empty() {
            Vec::new().into_iter()
        } else {
            self.limiter.acquire().await;
            embed_exact(self.embedder.as_ref(), &texts).await?.into_iter()
        };

        let rows = chunk
            .into_iter()
            .map(|doc| {
                let vector = if doc.has_content() { vectors.next() } else { None };
                DocumentWrite::embedded(doc, vector)
            })
            .collect();

        self.documents.upsert_batch(rows).await
    }

    /// Store `docs` as `pending` for a later drain
    ///
    /// With `drain_after_insert`, a drain pass runs before returning.
    #[instrument(skip(self, docs), fields(count = docs.len()))]
    pub async fn insert_pending(&self, docs: Vec<DocumentInput>) -> TesseraResult<Vec<String>> {
        for doc in &docs {
            doc.validate()?;
        }
        let rows = docs.into_iter().map(DocumentWrite::pending).collect();
        let ids = self.documents.upsert_batch(rows).await?;

        if self.config.drain_after_insert {
            let report = self.process_pending_embeddings().await?;
            debug!(?report, "Drained after insert");
        }
        Ok(ids)
    }

    /// Embed up to `drain_batch_size` pending documents
    ///
    /// Provider failures mark the affected document `failed` and the pass
    /// continues; storage failures end the pass.
    #[instrument(skip(self))]
    pub async fn process_pending_embeddings(&self) -> TesseraResult<DrainReport> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Drain already in progress, skipping");
            return Ok(DrainReport::skipped());
        }
        let _guard = DrainGuard(&self.draining);

        let claimed = self
            .documents
            .claim_pending(self.config.drain_batch_size, self.config.processing_lease())
            .await?;
        let mut report = DrainReport {
            claimed: claimed.len(),
            ..DrainReport::default()
        };

        for doc in claimed {
            self.limiter.acquire().await;
            match embed_one(self.embedder.as_ref(), &doc.content).await {
                Ok(vector) => {
                    if self.documents.mark_completed(&doc.id, &vector).await? {
                        report.completed += 1;
                    } else {
                        debug!(id = %doc.id, "Document changed while embedding, keeping newer row");
                    }
                }
                Err(err) => {
                    warn!(id = %doc.id, error = %err, "Embedding failed");
                    if self.documents.mark_failed(&doc.id, &err.to_string()).await? {
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            claimed = report.claimed,
            completed = report.completed,
            failed = report.failed,
            "Drain pass finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("documents", &self.documents)
            .field("model", &self.embedder.model())
            .field("config", &self.config)
            .field("draining", &self.is_draining())
            .finish()
    }
}
