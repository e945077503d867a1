//! Round-robin load balancing strategy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use crate::load_balancer::instance::ServerInstance;

/// Round-robin selector.
/// Stores an internal counter to rotate through the healthy instances.
/// The counter is never reset, so it keeps rotating across topology changes.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&self, candidates: &[Arc<ServerInstance>]) -> Option<Arc<ServerInstance>> {
        let healthy: Vec<&Arc<ServerInstance>> =
            candidates.iter().filter(|i| i.is_healthy()).collect();
        if healthy.is_empty() {
            return None;
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % healthy.len();
        healthy.get(index).map(|i| Arc::clone(i))
    }
}
