//! Adaptive service gateway.
//!
//! Routes each inbound call to a healthy instance of the target service,
//! with failover, per-instance resilience policies and an optional
//! response cache.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http::server ──▶ routing ──▶ cache ──▶ dispatch::Dispatcher
//!                                                        │
//!                     ┌──────────────────────────────────┤
//!                     ▼                                  ▼
//!               discovery (URLs)            load_balancer (registry + strategy)
//!                                                        │
//!                                                        ▼
//!                                  resilience (rate limit → retry → breaker)
//!                                                        │
//!                                                        ▼
//!                                           dispatch::transport ──▶ Instance
//!
//!   health::HealthMonitor ── periodic probes ──▶ load_balancer::ServerRegistry
//! ```

// Core subsystems
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod routing;

// Traffic management
pub mod cache;
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use dispatch::Dispatcher;
pub use error::{GatewayError, GatewayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
