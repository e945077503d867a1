//! Service discovery collaborator.
//!
//! The routing core only needs two questions answered: which services
//! exist, and which base URLs serve a given service. `StaticDiscovery`
//! answers them from the `[services]` config table; a registry client can
//! implement the same trait.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::PoisonError;

/// Source of service instances.
pub trait Discovery: Send + Sync + std::fmt::Debug {
    /// Names of every known service.
    fn services(&self) -> Vec<String>;

    /// Base URLs of the instances serving `service`.
    fn instances(&self, service: &str) -> Vec<String>;
}

/// Discovery backed by a fixed table, replaceable at runtime.
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    services: RwLock<BTreeMap<String, Vec<String>>>,
}

impl StaticDiscovery {
    pub fn new(services: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            services: RwLock::new(normalize(services)),
        }
    }

    /// Replace the instance list of one service.
    pub fn set_instances(&self, service: &str, urls: Vec<String>) {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        services.insert(service.to_string(), urls.into_iter().map(trim_url).collect());
    }
}

impl Discovery for StaticDiscovery {
    fn services(&self) -> Vec<String> {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        services.keys().cloned().collect()
    }

    fn instances(&self, service: &str) -> Vec<String> {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        services.get(service).cloned().unwrap_or_default()
    }
}

/// Base URLs are stored without a trailing slash so `url + path` is well formed.
fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn normalize(services: BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    services
        .into_iter()
        .map(|(name, urls)| (name, urls.into_iter().map(trim_url).collect()))
        .collect()
}
