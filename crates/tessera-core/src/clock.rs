//! Injectable time source
//!
//! Retry backoff and rate limiting both wait. Routing those waits through
//! [`Clock`] lets tests substitute [`ManualClock`], which records every sleep
//! and advances virtual time instantly.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

/// A source of "now" and a way to wait
#[async_trait]
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant
    fn now(&self) -> Instant;

    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by `tokio::time`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Shared default clock
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(TokioClock)
}

#[derive(Debug, Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// Virtual clock for tests
///
/// `sleep` returns immediately after advancing virtual time by the requested
/// amount and recording it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    /// Start a clock at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Arc::default(),
        }
    }

    /// Move virtual time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        self.state.lock().elapsed += duration;
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }

    /// Sum of all requested sleeps
    pub fn total_slept(&self) -> Duration {
        self.state.lock().sleeps.iter().sum()
    }

    /// Virtual time since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().elapsed
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.state.lock();
            state.elapsed += duration;
            state.sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}
