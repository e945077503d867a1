//! Retry logic.
//!
//! # Responsibilities
//! - Bound the number of attempts against one target
//! - Retry only transient failures (network, timeout, 5xx)
//! - Wait the configured backoff between attempts
//!
//! # Design Decisions
//! - 4xx and guard rejections fail immediately and consume no budget
//! - The last error is surfaced once attempts are exhausted

use std::future::Future;
use crate::config::RetryConfig;
use crate::error::GatewayError;
use crate::resilience::backoff::Backoff;

/// Bounded retry with backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Backoff::from_config(config))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it succeeds, fails non-transiently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, target: &str, mut op: F) -> Result<T, GatewayError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff.delay(attempt);
                    tracing::info!(
                        target_url = %target,
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "Retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
