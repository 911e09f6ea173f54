//! OpenAI-compatible embedding provider
//!
//! Works with any endpoint that implements `POST {endpoint}/embeddings`
//! (OpenAI, Azure-style proxies, Ollama's OpenAI shim, vLLM, ...).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tessera_config::EmbeddingConfig;
use tracing::{debug, error, info};

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};

/// Embedding provider speaking the OpenAI embeddings API
pub struct OpenAiEmbeddingProvider {
    client: Client,
    config: EmbeddingConfig,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl OpenAiEmbeddingProvider {
    /// Create a provider; fails if the endpoint or model is empty
    pub fn new(config: EmbeddingConfig) -> EmbeddingResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(EmbeddingError::Configuration(
                "embedding endpoint is required".to_string(),
            ));
        }
        if config.model.trim().is_empty() {
            return Err(EmbeddingError::Configuration(
                "embedding model is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                EmbeddingError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        info!(endpoint = %config.endpoint, model = %config.model, "Created embedding provider");

        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_strings(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        debug!(count = texts.len(), "Requesting embeddings");

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
            encoding_format: "float",
        };

        let mut builder = self.client.post(self.url()).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %message, "Embedding request failed");
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parsing(e.to_string()))?;

        // Sort by index to maintain input order
        body.data.sort_by_key(|item| item.index);
        let vectors: Vec<Vec<f32>> = body.data.into_iter().map(|item| item.embedding).collect();

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            });
        }

        debug!(count = vectors.len(), "Received embeddings");
        Ok(vectors)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

impl std::fmt::Debug for OpenAiEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddingProvider")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}
