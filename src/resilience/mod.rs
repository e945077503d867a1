//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call to an instance:
//!     → guard.rs (per-target policy lookup)
//!     → rate_limit.rs (token bucket, bounded wait)
//!     → retries.rs (retry transient failures with backoff.rs delays)
//!     → circuit_breaker.rs (fail fast while open)
//!     → timeouts.rs (deadline on the call itself)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Policies are plain state machines, testable without network I/O
//! - Same-instance retry lives here; failover to other instances is the dispatcher's job

pub mod backoff;
pub mod circuit_breaker;
pub mod guard;
pub mod rate_limit;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitState};
pub use guard::ResilienceGuard;
pub use rate_limit::RateLimiter;
pub use retries::RetryPolicy;
