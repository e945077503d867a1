//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming path "/features/hello?x=1"
//!     → router.rs (first segment → service name)
//!     → Return: ("FEATURE-SERVICE", "/hello?x=1") or RouteError
//! ```
//!
//! # Design Decisions
//! - Routes built at startup from `[routes]`, immutable at runtime
//! - No regex in hot path (one split, one hash lookup)
//! - Explicit errors rather than a silent default service

pub mod router;

pub use router::{ResolvedRoute, RouteError, ServiceRouter};
