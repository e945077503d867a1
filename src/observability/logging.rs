//! Structured logging.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to
//! this crate and `tower_http`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is absent.
pub fn default_directive(level: &str) -> String {
    format!("service_gateway={level},tower_http={level}")
}

/// Initialize the global tracing subscriber. Safe to call more than once.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
