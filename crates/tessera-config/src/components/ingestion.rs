//! Ingestion component configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Batching and rate limits for document ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Documents per embedding-provider call on the synchronous path
    pub batch_size: usize,
    /// Pending rows claimed per asynchronous drain pass
    pub drain_batch_size: usize,
    /// Outbound embedding requests allowed per second on the drain path
    pub embed_requests_per_second: u32,
    /// Kick off a drain pass after every pending insert
    pub drain_after_insert: bool,
    /// Seconds a claimed row may stay `processing` before a later drain
    /// reclaims it
    pub processing_lease_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            drain_batch_size: 10,
            embed_requests_per_second: 5,
            drain_after_insert: false,
            processing_lease_secs: 300,
        }
    }
}

impl IngestionConfig {
    /// How long a drain's claim on a row lasts
    pub fn processing_lease(&self) -> Duration {
        Duration::from_secs(self.processing_lease_secs)
    }
}
