//! Response cache.
//!
//! Successful answers to safe, bodiless methods (GET, HEAD) are kept for a
//! fixed TTL, keyed by `service:method:path`. A hit never reaches the
//! dispatcher. Errors are never cached.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use axum::http::Method;
use dashmap::DashMap;
use tokio::time::Instant;
use crate::config::CacheConfig;
use crate::dispatch::GatewayResponse;
use crate::error::GatewayResult;
use crate::observability::metrics;

/// Key-value store with per-entry expiry.
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<GatewayResponse>;
    fn set(&self, key: String, value: GatewayResponse, ttl: Duration);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: GatewayResponse,
    expires_at: Instant,
}

/// In-process store. Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<GatewayResponse> {
        let now = Instant::now();
        let hit = self.entries.get(key).and_then(|entry| {
            (entry.expires_at > now).then(|| entry.value.clone())
        });
        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        hit
    }

    fn set(&self, key: String, value: GatewayResponse, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key, entry);
    }
}

pub fn cache_key(service: &str, method: &Method, path: &str) -> String {
    format!("{}:{}:{}", service, method.as_str(), path)
}

fn is_cacheable(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// Read-through cache in front of the dispatcher.
#[derive(Debug)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    enabled: bool,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, enabled: bool) -> Self {
        Self { store, ttl, enabled }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Duration::from_secs(config.ttl_secs),
            config.enabled,
        )
    }

    /// Serve from cache when possible, otherwise run `forward` and remember a success.
    pub async fn get_or_forward<F, Fut>(
        &self,
        service: &str,
        method: &Method,
        path: &str,
        forward: F,
    ) -> GatewayResult<GatewayResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<GatewayResponse>>,
    {
        if !self.enabled || !is_cacheable(method) {
            return forward().await;
        }

        let key = cache_key(service, method, path);
        if let Some(hit) = self.store.get(&key) {
            tracing::debug!(key = %key, "Cache hit");
            metrics::record_cache_lookup(true);
            return Ok(hit);
        }
        metrics::record_cache_lookup(false);

        let response = forward().await?;
        self.store.set(key, response.clone(), self.ttl);
        Ok(response)
    }
}
