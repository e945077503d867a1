//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every discovered instance, concurrently
//! - Skip the gateway itself and configured infrastructure services
//! - Retry a failing probe before declaring the instance unhealthy
//! - Write the verdict into the shared registry

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use crate::config::HealthCheckConfig;
use crate::discovery::Discovery;
use crate::dispatch::{HttpTransport, OutboundRequest};
use crate::load_balancer::ServerRegistry;
use crate::observability::metrics;

/// Decide whether a 2xx probe body means "up".
///
/// A JSON object with a `status` field must say `UP` (any case). Without
/// `require_status_body`, a missing field or a non-JSON body is accepted.
pub fn probe_verdict(body: &[u8], require_status_body: bool) -> Result<(), String> {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("status") {
            Some(serde_json::Value::String(s)) if s.eq_ignore_ascii_case("UP") => Ok(()),
            Some(other) => Err(format!("reported status {}", other)),
            None if require_status_body => Err("missing status field".to_string()),
            None => Ok(()),
        },
        _ if require_status_body => Err("body is not a JSON status object".to_string()),
        _ => Ok(()),
    }
}

pub struct HealthMonitor {
    discovery: Arc<dyn Discovery>,
    registry: Arc<ServerRegistry>,
    transport: Arc<dyn HttpTransport>,
    config: HealthCheckConfig,
    self_service: String,
}

impl HealthMonitor {
    pub fn new(
        discovery: Arc<dyn Discovery>,
        registry: Arc<ServerRegistry>,
        transport: Arc<dyn HttpTransport>,
        config: HealthCheckConfig,
        self_service: impl Into<String>,
    ) -> Self {
        Self {
            discovery,
            registry,
            transport,
            config,
            self_service: self_service.into(),
        }
    }

    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            initial_delay_ms = self.config.initial_delay_ms,
            interval_ms = self.config.interval_ms,
            path = %self.config.path,
            "Health monitor starting"
        );

        let start = Instant::now() + Duration::from_millis(self.config.initial_delay_ms);
        let mut ticker = time::interval_at(start, Duration::from_millis(self.config.interval_ms));
        // A slow cycle pushes the next one back instead of bunching ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn is_excluded(&self, service: &str) -> bool {
        service.eq_ignore_ascii_case(&self.self_service)
            || self
                .config
                .exclude_services
                .iter()
                .any(|excluded| service.eq_ignore_ascii_case(excluded))
    }

    /// Probe every instance of every non-excluded service once. Returns how many were probed.
    pub async fn check_all(&self) -> usize {
        let targets: BTreeSet<String> = self
            .discovery
            .services()
            .into_iter()
            .filter(|service| !self.is_excluded(service))
            .flat_map(|service| self.discovery.instances(&service))
            .collect();

        join_all(targets.iter().map(|url| self.check_one(url))).await;
        targets.len()
    }

    async fn check_one(&self, url: &str) {
        let healthy = self.probe_with_retries(url).await;
        if self.registry.update_health(url, healthy) {
            if healthy {
                tracing::info!(instance = %url, "Instance is healthy again");
            } else {
                tracing::warn!(instance = %url, "Instance marked unhealthy by health check");
            }
        }
        metrics::record_backend_health(url, healthy);
    }

    async fn probe_with_retries(&self, url: &str) -> bool {
        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        for attempt in 0..=self.config.retries {
            match self.probe(url).await {
                Ok(()) => return true,
                Err(reason) => {
                    tracing::debug!(instance = %url, attempt, reason = %reason, "Health probe failed");
                    if attempt < self.config.retries {
                        time::sleep(retry_delay).await;
                    }
                }
            }
        }
        false
    }

    async fn probe(&self, url: &str) -> Result<(), String> {
        let request = OutboundRequest::get(
            format!("{}{}", url, self.config.path),
            Duration::from_millis(self.config.timeout_ms),
        );
        let response = self
            .transport
            .perform(request)
            .await
            .map_err(|e| e.to_string())?;
        probe_verdict(&response.body, self.config.require_status_body)
    }
}
