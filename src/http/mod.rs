//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID assigned and propagated)
//!     → routing (prefix → service)
//!     → cache / dispatcher (pick instance, forward, fail over)
//!     → response.rs (replay upstream answer or JSON error)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
