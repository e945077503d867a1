//! Request dispatcher.
//!
//! # Responsibilities
//! - Resolve a service name to candidate instances via discovery
//! - Pick one healthy, not-yet-tried instance with the configured strategy
//! - Hold a connection guard for the duration of the call
//! - Run the call under the instance's resilience guard
//! - Fail over to another instance on transient errors and guard rejections
//!
//! Client errors (4xx) are the caller's problem: they are returned as-is,
//! without failover and without touching the instance's health.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use crate::config::GatewayConfig;
use crate::discovery::Discovery;
use crate::dispatch::transport::{GatewayResponse, HttpTransport, OutboundRequest};
use crate::error::{GatewayError, GatewayResult};
use crate::load_balancer::{ServerInstance, ServerRegistry, Strategy, UnknownAlgorithm};
use crate::observability::metrics;
use crate::resilience::ResilienceGuard;

/// Routes one request to one instance of a service, with failover.
#[derive(Debug)]
pub struct Dispatcher {
    discovery: Arc<dyn Discovery>,
    registry: Arc<ServerRegistry>,
    strategy: Strategy,
    guard: ResilienceGuard,
    transport: Arc<dyn HttpTransport>,
    max_attempts: u32,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        discovery: Arc<dyn Discovery>,
        registry: Arc<ServerRegistry>,
        strategy: Strategy,
        guard: ResilienceGuard,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            discovery,
            registry,
            strategy,
            guard,
            transport,
            max_attempts: 3,
            request_timeout: Duration::from_secs(5),
        }
    }

    /// Build a dispatcher from the relevant config sections.
    pub fn from_config(
        config: &GatewayConfig,
        discovery: Arc<dyn Discovery>,
        registry: Arc<ServerRegistry>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, UnknownAlgorithm> {
        let strategy = Strategy::from_name(&config.gateway.algorithm)?;
        let guard = ResilienceGuard::new(
            &config.retries,
            &config.circuit_breaker,
            &config.rate_limit,
        );
        Ok(Self::new(discovery, registry, strategy, guard, transport)
            .with_max_attempts(config.dispatcher.max_attempts)
            .with_request_timeout(config.gateway.request_timeout()))
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn guard(&self) -> &ResilienceGuard {
        &self.guard
    }

    /// Forward a request to `service`, trying up to `max_attempts` distinct instances.
    pub async fn forward(
        &self,
        service: &str,
        path: &str,
        method: &Method,
        headers: &HeaderMap,
        body: Bytes,
    ) -> GatewayResult<GatewayResponse> {
        let mut tried: HashSet<String> = HashSet::new();
        let mut last_error: Option<GatewayError> = None;

        for attempt in 1..=self.max_attempts {
            let urls = self.discovery.instances(service);
            if urls.is_empty() {
                tracing::warn!(service = %service, "No instances registered");
                return Err(self.give_up(service, &tried, last_error, || {
                    GatewayError::NoInstances {
                        service: service.to_string(),
                    }
                }));
            }

            let candidates: Vec<Arc<ServerInstance>> = self
                .registry
                .snapshot(&urls)
                .into_iter()
                .filter(|i| i.is_healthy() && !tried.contains(i.url()))
                .collect();
            if candidates.is_empty() {
                tracing::warn!(service = %service, "No healthy untried instances");
                return Err(self.give_up(service, &tried, last_error, || {
                    GatewayError::NoHealthyInstances {
                        service: service.to_string(),
                    }
                }));
            }

            let Some(instance) = self.strategy.select(&candidates) else {
                return Err(GatewayError::SelectionFailed {
                    service: service.to_string(),
                });
            };
            tried.insert(instance.url().to_string());

            tracing::debug!(
                service = %service,
                instance = %instance.url(),
                attempt,
                algorithm = self.strategy.algorithm().name(),
                "Dispatching request"
            );

            match self.call_instance(&instance, path, method, headers, &body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    if instance.set_healthy(false) {
                        tracing::warn!(instance = %instance.url(), error = %e, "Marking instance unhealthy");
                        metrics::record_backend_health(instance.url(), false);
                    }
                    last_error = Some(e);
                }
                Err(e) if e.is_rejection() => {
                    tracing::info!(instance = %instance.url(), error = %e, "Instance rejected the call");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if attempt < self.max_attempts {
                tracing::info!(service = %service, attempt, "Failing over to another instance");
                metrics::record_failover(service);
            }
        }

        Err(self.give_up(service, &tried, last_error, || GatewayError::NoHealthyInstances {
            service: service.to_string(),
        }))
    }

    /// Wrap the last error once at least one instance was tried; otherwise report `first`.
    fn give_up(
        &self,
        service: &str,
        tried: &HashSet<String>,
        last_error: Option<GatewayError>,
        first: impl FnOnce() -> GatewayError,
    ) -> GatewayError {
        match last_error {
            Some(last) => GatewayError::RetriesExhausted {
                service: service.to_string(),
                attempts: tried.len() as u32,
                last: Box::new(last),
            },
            None => first(),
        }
    }

    async fn call_instance(
        &self,
        instance: &Arc<ServerInstance>,
        path: &str,
        method: &Method,
        headers: &HeaderMap,
        body: &Bytes,
    ) -> GatewayResult<GatewayResponse> {
        let _connection = instance.acquire();
        let url = format!("{}{}", instance.url(), path);

        // Only the admitted round trip is timed: limiter waits and retry
        // backoff are not part of the sample.
        let result = self
            .guard
            .call(instance.url(), || {
                let call = self.transport.perform(OutboundRequest {
                    method: method.clone(),
                    url: url.clone(),
                    headers: headers.clone(),
                    body: body.clone(),
                    timeout: self.request_timeout,
                });
                async move {
                    let start = Instant::now();
                    call.await.map(|response| (response, start.elapsed()))
                }
            })
            .await;

        result.map(|(response, elapsed)| {
            let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
            let average = instance.record_latency(elapsed_ms);
            tracing::debug!(instance = %instance.url(), elapsed_ms, average_ms = average, "Call completed");
            response
        })
    }
}
