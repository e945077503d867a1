//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Routing core settings (own name, algorithm, timeouts).
    pub gateway: RoutingConfig,

    /// Static service discovery: service name -> instance base URLs.
    pub services: BTreeMap<String, Vec<String>>,

    /// Path prefix -> service name.
    pub routes: BTreeMap<String, String>,

    /// Instance failover settings.
    pub dispatcher: DispatcherConfig,

    /// Same-instance retry settings.
    pub retries: RetryConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Core routing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Name this gateway is registered under; never health-probed.
    pub service_name: String,

    /// Selection algorithm: round-robin, least-connections, adaptive, adaptive-latency.
    pub algorithm: String,

    /// Timeout for a single outbound call in milliseconds.
    pub request_timeout_ms: u64,

    /// Maximum inbound and upstream body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            service_name: "api-gateway".to_string(),
            algorithm: "least-connections".to_string(),
            request_timeout_ms: 5_000,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl RoutingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Failover across instances.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Maximum number of distinct instances tried per request.
    pub max_attempts: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Backoff shape between retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts against one instance (including the first).
    pub max_attempts: u32,

    /// Fixed delay or exponential backoff with jitter.
    pub backoff: BackoffKind,

    /// Base delay in milliseconds.
    pub base_delay_ms: u64,

    /// Cap for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffKind::Fixed,
            base_delay_ms: 500,
            max_delay_ms: 2000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Number of most recent calls in the rolling window.
    pub window_size: usize,

    /// Calls that must be recorded before the failure rate is evaluated.
    pub minimum_calls: usize,

    /// Failure percentage (0-100) at which the circuit opens.
    pub failure_rate_threshold: f64,

    /// How long the circuit stays open before allowing trial calls.
    pub open_duration_ms: u64,

    /// Trial calls permitted while half-open.
    pub half_open_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            minimum_calls: 10,
            failure_rate_threshold: 50.0,
            open_duration_ms: 30_000,
            half_open_calls: 3,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Permits handed out per period.
    pub permits_per_period: u32,

    /// Refresh period in milliseconds.
    pub period_ms: u64,

    /// How long a call may wait for a permit in milliseconds.
    pub wait_timeout_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            permits_per_period: 10,
            period_ms: 1000,
            wait_timeout_ms: 500,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Delay before the first cycle in milliseconds.
    pub initial_delay_ms: u64,

    /// Health check interval in milliseconds.
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Path to probe for HTTP health checks.
    pub path: String,

    /// Extra attempts per probe before declaring the instance unhealthy.
    pub retries: u32,

    /// Fixed delay between probe attempts in milliseconds.
    pub retry_delay_ms: u64,

    /// Require a JSON body with `"status": "UP"`.
    pub require_status_body: bool,

    /// Infrastructure services that are never probed.
    pub exclude_services: Vec<String>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 5_000,
            interval_ms: 10_000,
            timeout_ms: 2_000,
            path: "/actuator/health".to_string(),
            retries: 1,
            retry_delay_ms: 500,
            require_status_body: false,
            exclude_services: vec!["discovery-server".to_string(), "eureka-server".to_string()],
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache GET/HEAD responses.
    pub enabled: bool,

    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [gateway]
            algorithm = "round-robin"

            [services]
            FEATURE-SERVICE = ["http://127.0.0.1:9001", "http://127.0.0.1:9002"]

            [routes]
            features = "FEATURE-SERVICE"
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.algorithm, "round-robin");
        assert_eq!(config.gateway.service_name, "api-gateway");
        assert_eq!(config.services["FEATURE-SERVICE"].len(), 2);
        assert_eq!(config.routes["features"], "FEATURE-SERVICE");
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.retries.backoff, BackoffKind::Fixed);
        assert_eq!(config.health_check.path, "/actuator/health");
    }

    #[test]
    fn test_backoff_kind_parses_lowercase() {
        let config: RetryConfig = toml::from_str(r#"backoff = "exponential""#).unwrap();
        assert_eq!(config.backoff, BackoffKind::Exponential);
    }
}
