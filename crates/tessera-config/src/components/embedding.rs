//! Embedding provider configuration

use serde::{Deserialize, Serialize};

/// Embedding provider type - enum for TOML serialization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// Any OpenAI-compatible `/embeddings` endpoint
    #[default]
    OpenAI,
    /// Deterministic in-process provider for tests and demos
    Mock,
}

/// Embedding provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider implementation
    pub provider: EmbeddingProviderType,
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub endpoint: String,
    /// Model name sent with every request
    pub model: String,
    /// Bearer token, if the endpoint needs one
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Expected vector dimensions (used by the mock provider)
    pub dimensions: usize,
}

impl EmbeddingConfig {
    /// Create an OpenAI-compatible configuration
    pub fn openai(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: EmbeddingProviderType::OpenAI,
            endpoint: endpoint.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Create a mock configuration
    pub fn mock(dimensions: usize) -> Self {
        Self {
            provider: EmbeddingProviderType::Mock,
            model: "mock".to_string(),
            dimensions,
            ..Self::default()
        }
    }

    /// Builder-style: set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::OpenAI,
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            timeout_secs: 30,
            dimensions: 1536,
        }
    }
}
