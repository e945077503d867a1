//! Backend instance abstraction.
//!
//! # Responsibilities
//! - Represent a single backend endpoint, identified by its base URL
//! - Track active connections (for Least Connections / Adaptive)
//! - Track the rolling average latency (for Adaptive)
//! - Track the health flag written by the health monitor and dispatcher

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use serde::{Deserialize, Serialize};

/// A single backend instance.
///
/// Every field is an independent atomic; no cross-field invariant is
/// observed atomically.
#[derive(Debug)]
pub struct ServerInstance {
    url: String,
    active_connections: AtomicUsize,
    /// f64 milliseconds stored as raw bits.
    avg_latency_bits: AtomicU64,
    healthy: AtomicBool,
}

impl ServerInstance {
    /// Create a fresh instance: no connections, zero latency, healthy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            active_connections: AtomicUsize::new(0),
            avg_latency_bits: AtomicU64::new(0f64.to_bits()),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the current number of active connections.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Increment active connection count.
    pub fn inc_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement active connection count, saturating at zero.
    pub fn dec_connections(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Increment the connection count and hand back a guard that undoes it.
    pub fn acquire(self: &Arc<Self>) -> ConnectionGuard {
        self.inc_connections();
        ConnectionGuard {
            instance: self.clone(),
        }
    }

    /// Rolling average latency in milliseconds.
    pub fn avg_latency_ms(&self) -> f64 {
        f64::from_bits(self.avg_latency_bits.load(Ordering::Relaxed))
    }

    pub fn set_avg_latency_ms(&self, value: f64) {
        self.avg_latency_bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Fold one observed latency into the average: `(old + elapsed) / 2`.
    pub fn record_latency(&self, elapsed_ms: f64) -> f64 {
        let mut next = elapsed_ms;
        let _ = self
            .avg_latency_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                next = (f64::from_bits(bits) + elapsed_ms) / 2.0;
                Some(next.to_bits())
            });
        next
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Set the health flag. Returns the previous value.
    pub fn set_healthy(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::Relaxed)
    }

    /// Point-in-time copy of all fields, for reporting only.
    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            url: self.url.clone(),
            healthy: self.is_healthy(),
            active_connections: self.active_connections(),
            avg_latency_ms: self.avg_latency_ms(),
        }
    }
}

/// Serializable view of an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub url: String,
    pub healthy: bool,
    pub active_connections: usize,
    pub avg_latency_ms: f64,
}

/// A RAII guard that manages the active connection count.
#[derive(Debug)]
pub struct ConnectionGuard {
    instance: Arc<ServerInstance>,
}

impl Deref for ConnectionGuard {
    type Target = ServerInstance;
    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.instance.dec_connections();
    }
}
