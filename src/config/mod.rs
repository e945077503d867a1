//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, algorithm name)
//!     → GatewayConfig (validated, immutable)
//!     → sections handed to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Any configuration error aborts startup

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use validation::{config_warnings, ConfigWarning};
pub use schema::{
    AdminConfig, BackoffKind, CacheConfig, CircuitBreakerConfig, DispatcherConfig,
    GatewayConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    RetryConfig, RoutingConfig,
};
