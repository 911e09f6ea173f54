//! Retry policy for writes under lock contention
//!
//! Attempt `n` (1-based) that fails transiently is followed by a wait of
//! `min(base * 2^(n-1), max)`, shortened by a random jitter fraction. The
//! caller's [`CancellationToken`] is checked before every attempt and raced
//! against every wait.

use std::future::Future;
use std::time::Duration;

use tessera_config::RetryConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{TesseraError, TesseraResult};

/// Errors that can say whether retrying might help
pub trait Transient {
    /// True for lock/busy conditions
    fn is_transient(&self) -> bool;
}

/// Bounded exponential backoff with jitter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Wait after the first failure
    pub base_delay: Duration,
    /// Cap on any single wait
    pub max_delay: Duration,
    /// Fraction of each wait that may be shaved off, in `[0, 1]`
    pub jitter: f64,
}

impl RetryPolicy {
    /// Build from configuration
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    /// Same policy without randomness
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Wait before attempt `attempt + 1`, given a uniform sample in `[0, 1)`
    pub fn delay_for(&self, attempt: u32, sample: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let backoff = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        let factor = 1.0 - self.jitter * sample.clamp(0.0, 1.0);
        backoff.mul_f64(factor)
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let sample = if self.jitter > 0.0 {
            rand::random::<f64>()
        } else {
            0.0
        };
        self.delay_for(attempt, sample)
    }

    /// Run `op` until it succeeds, fails permanently, exhausts its attempts,
    /// or `cancel` fires
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(
        &self,
        clock: &dyn Clock,
        cancel: &CancellationToken,
        mut op: F,
    ) -> TesseraResult<T>
    where
        E: Transient + Into<TesseraError> + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(TesseraError::Cancelled);
            }
            attempt += 1;

            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err.into());
            }
            if attempt >= self.max_attempts {
                warn!(attempts = attempt, error = %err, "Giving up after lock contention");
                return Err(TesseraError::TransientStorage {
                    attempts: attempt,
                    message: err.to_string(),
                });
            }

            let delay = self.next_delay(attempt);
            debug!(attempt, ?delay, error = %err, "Transient storage error, backing off");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TesseraError::Cancelled),
                _ = clock.sleep(delay) => {}
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
