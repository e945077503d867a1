//! Least Connections load balancing strategy.

use std::sync::Arc;
use crate::load_balancer::instance::ServerInstance;

/// Least connections selector.
/// Selects the healthy instance with the minimum number of active connections.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, candidates: &[Arc<ServerInstance>]) -> Option<Arc<ServerInstance>> {
        // `min_by_key` keeps the first minimum, so ties go to input order.
        candidates
            .iter()
            .filter(|i| i.is_healthy())
            .min_by_key(|i| i.active_connections())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_connections(counts: &[usize]) -> Vec<Arc<ServerInstance>> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let instance = Arc::new(ServerInstance::new(format!("http://127.0.0.1:{}", 9000 + i)));
                for _ in 0..count {
                    instance.inc_connections();
                }
                instance
            })
            .collect()
    }

    #[test]
    fn test_least_conn_picks_minimum() {
        let lb = LeastConnections::new();
        let pool = with_connections(&[3, 1, 2]);
        let s = lb.select(&pool).unwrap();
        assert_eq!(s.url(), pool[1].url());
    }

    #[test]
    fn test_least_conn_tie_goes_to_first() {
        let lb = LeastConnections::new();
        let pool = with_connections(&[2, 1, 1]);
        assert_eq!(lb.select(&pool).unwrap().url(), pool[1].url());
    }

    #[test]
    fn test_least_conn_ignores_unhealthy() {
        let lb = LeastConnections::new();
        let pool = with_connections(&[3, 0, 2]);
        pool[1].set_healthy(false);
        assert_eq!(lb.select(&pool).unwrap().url(), pool[2].url());

        pool[0].set_healthy(false);
        pool[2].set_healthy(false);
        assert!(lb.select(&pool).is_none());
    }
}
