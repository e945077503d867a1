//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer (initial delay, fixed interval)
//!     → Probe each discovered instance concurrently
//!     → registry.update_health(url, verdict)
//!
//! Passive signal (dispatch):
//!     Transient failure on a live request
//!     → instance marked unhealthy immediately
//!     → only an active probe can bring it back
//! ```

pub mod active;

pub use active::{probe_verdict, HealthMonitor};
