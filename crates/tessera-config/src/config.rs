//! Top-level configuration and loading

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::components::{
    EmbeddingConfig, IngestionConfig, RetrievalConfig, RetryConfig, StorageConfig,
};
use crate::identifier::validate_identifier;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The TOML could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A table name failed validation
    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier {
        /// The rejected identifier
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A value is out of range
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Dotted field path
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete tessera configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    /// Database settings
    pub storage: StorageConfig,
    /// Ingestion batching and rate limiting
    pub ingestion: IngestionConfig,
    /// Retrieval and fusion
    pub retrieval: RetrievalConfig,
    /// Write retry under contention
    pub retry: RetryConfig,
    /// Embedding provider
    pub embedding: EmbeddingConfig,
}

impl TesseraConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> ConfigResult<()> {
        validate_identifier(&self.storage.documents_table)?;
        validate_identifier(&self.storage.triples_table)?;
        if self.storage.documents_table == self.storage.triples_table {
            return Err(ConfigError::InvalidValue {
                field: "storage.triples_table",
                message: "must differ from storage.documents_table".to_string(),
            });
        }

        if self.ingestion.batch_size == 0 {
            return Err(invalid("ingestion.batch_size", "must be greater than 0"));
        }
        if self.ingestion.drain_batch_size == 0 {
            return Err(invalid("ingestion.drain_batch_size", "must be greater than 0"));
        }
        if self.ingestion.embed_requests_per_second == 0 {
            return Err(invalid(
                "ingestion.embed_requests_per_second",
                "must be greater than 0",
            ));
        }

        let r = &self.retrieval;
        for (field, weight) in [
            ("retrieval.vector_weight", r.vector_weight),
            ("retrieval.fulltext_weight", r.fulltext_weight),
            ("retrieval.graph_score", r.graph_score),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(field, "must be a finite, non-negative number"));
            }
        }
        if r.candidate_multiplier == 0 {
            return Err(invalid("retrieval.candidate_multiplier", "must be greater than 0"));
        }
        if r.default_limit == 0 {
            return Err(invalid("retrieval.default_limit", "must be greater than 0"));
        }

        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(invalid("retry.jitter", "must be within [0, 1]"));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(invalid("retry.max_delay_ms", "must be >= retry.base_delay_ms"));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        message: message.to_string(),
    }
}
