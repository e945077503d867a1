//! Per-target composition of rate limiter, circuit breaker and retry.
//!
//! ```text
//! call(target)
//!     → rate_limit.rs   (once, at entry)
//!     → retries.rs      (bounded attempts, transient errors only)
//!         → circuit_breaker.rs (gates every attempt)
//!             → outbound call
//! ```
//!
//! A rejection by the limiter or the breaker never reaches the network and
//! is never retried.

use std::future::Future;
use std::sync::Arc;
use dashmap::DashMap;
use crate::config::{CircuitBreakerConfig, RateLimitConfig, RetryConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::resilience::rate_limit::RateLimiter;
use crate::resilience::retries::RetryPolicy;

/// Resilience policies keyed by target (instance URL).
#[derive(Debug)]
pub struct ResilienceGuard {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    limiters: DashMap<String, Arc<RateLimiter>>,
    retry: RetryPolicy,
    breaker_config: CircuitBreakerConfig,
    rate_limit_config: RateLimitConfig,
}

impl ResilienceGuard {
    pub fn new(
        retry: &RetryConfig,
        breaker: &CircuitBreakerConfig,
        rate_limit: &RateLimitConfig,
    ) -> Self {
        Self {
            breakers: DashMap::new(),
            limiters: DashMap::new(),
            retry: RetryPolicy::from_config(retry),
            breaker_config: breaker.clone(),
            rate_limit_config: rate_limit.clone(),
        }
    }

    fn breaker_for(&self, target: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(&self.breaker_config)))
            .clone()
    }

    fn limiter_for(&self, target: &str) -> Option<Arc<RateLimiter>> {
        if !self.rate_limit_config.enabled {
            return None;
        }
        Some(
            self.limiters
                .entry(target.to_string())
                .or_insert_with(|| Arc::new(RateLimiter::new(&self.rate_limit_config)))
                .clone(),
        )
    }

    /// Breaker state for a target, if a breaker was ever created for it.
    pub fn circuit_state(&self, target: &str) -> Option<CircuitState> {
        self.breakers.get(target).map(|b| b.state())
    }

    /// Run `op` against `target` under all three policies.
    pub async fn call<T, F, Fut>(&self, target: &str, mut op: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        if let Some(limiter) = self.limiter_for(target) {
            if !limiter.acquire().await {
                tracing::warn!(target_url = %target, "Rate limit exceeded");
                metrics::record_rate_limited(target);
                return Err(GatewayError::RateLimited {
                    target: target.to_string(),
                });
            }
        }

        let breaker = self.breaker_for(target);
        self.retry
            .run(target, |_attempt| {
                let breaker = breaker.clone();
                // Futures are lazy: nothing is sent unless the breaker admits the call.
                let call = op();
                async move {
                    let permit = match breaker.try_acquire() {
                        Ok(permit) => permit,
                        Err(retry_after) => {
                            return Err(GatewayError::CircuitOpen {
                                target: target.to_string(),
                                retry_after,
                            })
                        }
                    };

                    // Dropping this future before the call resolves drops the permit.
                    let result = call.await;
                    match &result {
                        Err(e) if e.is_transient() => {
                            if permit.failure() {
                                tracing::warn!(target_url = %target, error = %e, "Circuit opened");
                                metrics::record_circuit_opened(target);
                            }
                        }
                        _ => permit.success(),
                    }
                    result
                }
            })
            .await
    }
}
