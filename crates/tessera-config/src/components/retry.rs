//! Retry configuration for writes under lock contention

use serde::{Deserialize, Serialize};

/// Bounded exponential backoff with jitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
    /// Fraction of each delay that may be randomly shaved off, in `[0, 1]`
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 10,
            max_delay_ms: 200,
            jitter: 0.5,
        }
    }
}
