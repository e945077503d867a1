//! Adaptive load balancing strategies.
//!
//! `Adaptive` orders healthy instances by active connections, then by
//! rolling average latency. `AdaptiveLatency` is the latency-only variant.

use std::cmp::Ordering;
use std::sync::Arc;
use crate::load_balancer::instance::ServerInstance;

/// Connection count first, latency second.
#[derive(Debug, Default)]
pub struct Adaptive;

impl Adaptive {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, candidates: &[Arc<ServerInstance>]) -> Option<Arc<ServerInstance>> {
        first_min_by(candidates, |a, b| {
            a.active_connections()
                .cmp(&b.active_connections())
                .then_with(|| a.avg_latency_ms().total_cmp(&b.avg_latency_ms()))
        })
    }
}

/// Latency only.
#[derive(Debug, Default)]
pub struct AdaptiveLatency;

impl AdaptiveLatency {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, candidates: &[Arc<ServerInstance>]) -> Option<Arc<ServerInstance>> {
        first_min_by(candidates, |a, b| a.avg_latency_ms().total_cmp(&b.avg_latency_ms()))
    }
}

/// Minimum healthy candidate; the earliest one wins on ties.
fn first_min_by<F>(candidates: &[Arc<ServerInstance>], mut compare: F) -> Option<Arc<ServerInstance>>
where
    F: FnMut(&ServerInstance, &ServerInstance) -> Ordering,
{
    let mut best: Option<&Arc<ServerInstance>> = None;
    for candidate in candidates.iter().filter(|i| i.is_healthy()) {
        best = match best {
            Some(current) if compare(candidate, current) != Ordering::Less => Some(current),
            _ => Some(candidate),
        };
    }
    best.cloned()
}
