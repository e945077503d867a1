//! Server registry.
//!
//! # Responsibilities
//! - Own exactly one `ServerInstance` per distinct URL
//! - Hand out shared handles, never detached copies
//! - Accept health updates from any reporter (monitor, dispatcher)

use std::sync::Arc;
use dashmap::DashMap;
use crate::load_balancer::instance::{InstanceSnapshot, ServerInstance};

/// Concurrent map from instance URL to its live state.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    instances: DashMap<String, Arc<ServerInstance>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the instance for `url`, creating it atomically if absent.
    pub fn get_or_create(&self, url: &str) -> Arc<ServerInstance> {
        if let Some(existing) = self.instances.get(url) {
            return existing.clone();
        }
        self.instances
            .entry(url.to_string())
            .or_insert_with(|| {
                tracing::debug!(url = %url, "Registering new instance");
                Arc::new(ServerInstance::new(url))
            })
            .clone()
    }

    /// Set the health flag for `url`. Returns true when the flag changed.
    pub fn update_health(&self, url: &str, healthy: bool) -> bool {
        let instance = self.get_or_create(url);
        let previous = instance.set_healthy(healthy);
        previous != healthy
    }

    /// Current instance for each URL, in input order.
    pub fn snapshot(&self, urls: &[String]) -> Vec<Arc<ServerInstance>> {
        urls.iter().map(|url| self.get_or_create(url)).collect()
    }

    /// Look up an instance without creating it.
    pub fn get(&self, url: &str) -> Option<Arc<ServerInstance>> {
        self.instances.get(url).map(|r| r.value().clone())
    }

    /// Every registered instance, sorted by URL.
    pub fn all(&self) -> Vec<InstanceSnapshot> {
        let mut all: Vec<InstanceSnapshot> = self
            .instances
            .iter()
            .map(|r| r.value().snapshot())
            .collect();
        all.sort_by(|a, b| a.url.cmp(&b.url));
        all
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
