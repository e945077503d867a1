//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! (service, path, request)
//!     → dispatcher.rs (discovery → registry → strategy → failover loop)
//!         → resilience guard (limiter, retry, breaker) per instance
//!             → transport.rs (hyper client, timeout, body buffering)
//! ```

pub mod dispatcher;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use transport::{GatewayResponse, HttpTransport, HyperTransport, OutboundRequest};
