//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher resolves candidate URLs
//!     → registry.rs (get-or-create one ServerInstance per URL)
//!     → Apply the configured strategy:
//!         - round_robin.rs (rotate through healthy instances)
//!         - least_conn.rs (fewest active connections)
//!         - adaptive.rs (connections, then latency)
//!     → instance.rs (connection guard held for the call)
//! ```
//!
//! # Design Decisions
//! - Strategies never mutate instance state
//! - Unhealthy instances are never selected
//! - Strategy chosen once at startup from its config name; unknown names are fatal

pub mod adaptive;
pub mod instance;
pub mod least_conn;
pub mod registry;
pub mod round_robin;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use adaptive::{Adaptive, AdaptiveLatency};
pub use instance::{ConnectionGuard, InstanceSnapshot, ServerInstance};
pub use least_conn::LeastConnections;
pub use registry::ServerRegistry;
pub use round_robin::RoundRobin;

/// Selection algorithm names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    RoundRobin,
    LeastConnections,
    Adaptive,
    AdaptiveLatency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown load balancing algorithm: {}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "round-robin" => Ok(Algorithm::RoundRobin),
            "least-connections" => Ok(Algorithm::LeastConnections),
            "adaptive" => Ok(Algorithm::Adaptive),
            "adaptive-latency" => Ok(Algorithm::AdaptiveLatency),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "round-robin",
            Algorithm::LeastConnections => "least-connections",
            Algorithm::Adaptive => "adaptive",
            Algorithm::AdaptiveLatency => "adaptive-latency",
        }
    }
}

/// The selection strategy in use, one variant per algorithm.
#[derive(Debug)]
pub enum Strategy {
    RoundRobin(RoundRobin),
    LeastConnections(LeastConnections),
    Adaptive(Adaptive),
    AdaptiveLatency(AdaptiveLatency),
}

impl Strategy {
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::RoundRobin => Strategy::RoundRobin(RoundRobin::new()),
            Algorithm::LeastConnections => Strategy::LeastConnections(LeastConnections::new()),
            Algorithm::Adaptive => Strategy::Adaptive(Adaptive::new()),
            Algorithm::AdaptiveLatency => Strategy::AdaptiveLatency(AdaptiveLatency::new()),
        }
    }

    /// Build a strategy from its configuration name.
    pub fn from_name(name: &str) -> Result<Self, UnknownAlgorithm> {
        name.parse().map(Self::new)
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Strategy::RoundRobin(_) => Algorithm::RoundRobin,
            Strategy::LeastConnections(_) => Algorithm::LeastConnections,
            Strategy::Adaptive(_) => Algorithm::Adaptive,
            Strategy::AdaptiveLatency(_) => Algorithm::AdaptiveLatency,
        }
    }

    /// Pick one healthy instance, or none if there is no healthy candidate.
    pub fn select(&self, candidates: &[Arc<ServerInstance>]) -> Option<Arc<ServerInstance>> {
        match self {
            Strategy::RoundRobin(lb) => lb.select(candidates),
            Strategy::LeastConnections(lb) => lb.select(candidates),
            Strategy::Adaptive(lb) => lb.select(candidates),
            Strategy::AdaptiveLatency(lb) => lb.select(candidates),
        }
    }
}
