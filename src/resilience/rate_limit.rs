//! Token bucket rate limiter for outbound calls.
//!
//! Each target gets `permits_per_period` tokens per `period`, refilled
//! continuously. A caller that finds the bucket empty reserves the next
//! token and waits for it, unless that wait exceeds `wait_timeout`.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use crate::config::RateLimitConfig;

/// A simple token bucket. Tokens may go negative to represent reservations.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    /// Take one token, returning how long the caller must wait for it,
    /// or `None` if that wait would exceed `max_wait`.
    fn reserve(&mut self, now: Instant, capacity: f64, refill_per_sec: f64, max_wait: Duration) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Some(Duration::ZERO);
        }

        let wait = Duration::from_secs_f64((1.0 - self.tokens) / refill_per_sec);
        if wait > max_wait {
            return None;
        }
        self.tokens -= 1.0;
        Some(wait)
    }
}

/// Per-target rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    capacity: f64,
    refill_per_sec: f64,
    wait_timeout: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = f64::from(config.permits_per_period.max(1));
        let period = Duration::from_millis(config.period_ms.max(1));
        Self {
            bucket: Mutex::new(TokenBucket::new(capacity, Instant::now())),
            capacity,
            refill_per_sec: capacity / period.as_secs_f64(),
            wait_timeout: Duration::from_millis(config.wait_timeout_ms),
        }
    }

    /// Reserve a permit without waiting. `Some(wait)` means the permit is
    /// held and becomes usable after `wait`.
    pub fn reserve(&self) -> Option<Duration> {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.reserve(Instant::now(), self.capacity, self.refill_per_sec, self.wait_timeout)
    }

    /// Obtain a permit, sleeping up to the wait bound. Returns false when
    /// no permit could be obtained in time.
    pub async fn acquire(&self) -> bool {
        match self.reserve() {
            Some(wait) if wait.is_zero() => true,
            Some(wait) => {
                tokio::time::sleep(wait).await;
                true
            }
            None => false,
        }
    }
}
