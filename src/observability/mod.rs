//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured, request ID in span via tower-http)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via logging.rs subscriber
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Metric updates go through the `metrics` facade; they are no-ops
//!   until a recorder is installed, so tests need no setup

pub mod logging;
pub mod metrics;
