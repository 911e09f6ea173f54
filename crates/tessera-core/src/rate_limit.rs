//! Token-bucket rate limiter for outbound embedding calls
//!
//! The bucket starts full; tokens refill continuously at `capacity` per
//! `period`. [`RateLimiter::acquire`] waits (through the injected [`Clock`])
//! until a token is available.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::clock::Clock;

#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    /// Time to earn one token
    interval: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, interval: Duration, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity,
            interval,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let interval_nanos = self.interval.as_nanos();
        if elapsed.is_zero() || interval_nanos == 0 {
            return;
        }
        let earned = elapsed.as_nanos() as f64 / interval_nanos as f64;
        self.tokens = (self.tokens + earned).min(self.capacity);
        self.last_refill = now;
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_token(&mut self, now: Instant) -> Duration {
        self.refill(now);
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let needed = 1.0 - self.tokens;
            let nanos = (needed * self.interval.as_nanos() as f64).ceil() as u64;
            Duration::from_nanos(nanos)
        }
    }
}

/// Shared token bucket
#[derive(Debug, Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Allow `capacity` acquisitions per `period`, with bursts up to `capacity`
    pub fn new(capacity: u32, period: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        let interval = period / capacity;
        let bucket = TokenBucket::new(f64::from(capacity), interval, clock.now());
        Self {
            bucket: Arc::new(Mutex::new(bucket)),
            clock,
        }
    }

    /// Allow `rate` acquisitions per second
    pub fn per_second(rate: u32, clock: Arc<dyn Clock>) -> Self {
        Self::new(rate, Duration::from_secs(1), clock)
    }

    /// Wait until a token is available, then take it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = self.clock.now();
                if bucket.try_acquire(now) {
                    return;
                }
                bucket.time_until_token(now)
            };
            // Sleep outside the lock
            self.clock.sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Take a token if one is available right now
    pub async fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().await;
        bucket.try_acquire(self.clock.now())
    }

    /// Tokens currently available
    pub async fn remaining(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(self.clock.now());
        bucket.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn burst_up_to_capacity_without_waiting() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::per_second(5, Arc::new(clock.clone()));

        for _ in 0..5 {
            limiter.acquire().await;
        }

        assert!(clock.sleeps().is_empty());
        assert!(limiter.remaining().await < 1.0);
    }

    #[tokio::test]
    async fn sixth_request_waits_one_interval() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::per_second(5, Arc::new(clock.clone()));

        for _ in 0..6 {
            limiter.acquire().await;
        }

        let slept = clock.total_slept();
        assert!(slept >= Duration::from_millis(200), "{slept:?}");
        assert!(slept <= Duration::from_millis(202), "{slept:?}");
    }

    #[tokio::test]
    async fn sustained_rate_is_bounded() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::per_second(5, Arc::new(clock.clone()));

        for _ in 0..15 {
            limiter.acquire().await;
        }

        // 5 burst + 10 more at 5/s
        assert!(clock.elapsed() >= Duration::from_secs(2));
        assert!(clock.elapsed() < Duration::from_millis(2100));
    }

    #[tokio::test]
    async fn try_acquire_does_not_wait() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::per_second(1, Arc::new(clock.clone()));

        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);

        clock.advance(Duration::from_secs(1));
        assert!(limiter.try_acquire().await);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn refill_never_exceeds_capacity() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::per_second(5, Arc::new(clock.clone()));

        clock.advance(Duration::from_secs(60));
        assert_eq!(limiter.remaining().await, 5.0);
    }
}
