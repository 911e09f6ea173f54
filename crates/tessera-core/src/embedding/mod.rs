//! Embedding provider abstraction
//!
//! The ingestion pipeline and the vector index only need one operation:
//! turn a list of strings into a list of vectors, one per input, in order.
//! Everything else (model selection, auth, batching limits) is the
//! provider's business.

pub mod mock;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use tessera_config::{EmbeddingConfig, EmbeddingProviderType};
use thiserror::Error;

pub use mock::MockEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;

/// Embedding failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Provider answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Provider returned a different number of vectors than inputs
    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Inputs sent
        expected: usize,
        /// Vectors received
        actual: usize,
    },

    /// Response could not be decoded
    #[error("Failed to parse response: {0}")]
    Parsing(String),

    /// Provider is misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any other provider-side failure
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Result type for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Computes embeddings for text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input, in input order
    async fn embed_strings(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Model identifier, for logging
    fn model(&self) -> &str;
}

/// Call `provider` and insist on exactly one vector per input
pub async fn embed_exact(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> EmbeddingResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let vectors = provider.embed_strings(texts).await?;
    if vectors.len() != texts.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: texts.len(),
            actual: vectors.len(),
        });
    }
    Ok(vectors)
}

/// Embed a single string
pub async fn embed_one(provider: &dyn EmbeddingProvider, text: &str) -> EmbeddingResult<Vec<f32>> {
    let mut vectors = embed_exact(provider, &[text.to_string()]).await?;
    vectors.pop().ok_or(EmbeddingError::CountMismatch {
        expected: 1,
        actual: 0,
    })
}

/// Create an embedding provider from configuration
pub fn create_provider(config: &EmbeddingConfig) -> EmbeddingResult<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderType::OpenAI => {
            Ok(Arc::new(OpenAiEmbeddingProvider::new(config.clone())?))
        }
        EmbeddingProviderType::Mock => {
            Ok(Arc::new(MockEmbeddingProvider::with_dimensions(config.dimensions)))
        }
    }
}
