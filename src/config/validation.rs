//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference known services)
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//! - Reject unknown selection algorithm names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;
use crate::config::schema::GatewayConfig;
use crate::load_balancer::Algorithm;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown load balancing algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("route '{prefix}' points at unknown service '{service}'")]
    UnknownRouteTarget { prefix: String, service: String },

    #[error("service '{service}' has invalid instance url '{url}'")]
    InvalidInstanceUrl { service: String, url: String },

    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },

    #[error("circuit_breaker.failure_rate_threshold must be within (0, 100], got {0}")]
    FailureRateOutOfRange(f64),

    #[error("health_check.path must start with '/', got '{0}'")]
    HealthPathNotAbsolute(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.gateway.algorithm.parse::<Algorithm>().is_err() {
        errors.push(ValidationError::UnknownAlgorithm(config.gateway.algorithm.clone()));
    }

    for (prefix, service) in &config.routes {
        if !config.services.contains_key(service) {
            errors.push(ValidationError::UnknownRouteTarget {
                prefix: prefix.clone(),
                service: service.clone(),
            });
        }
    }

    for (service, urls) in &config.services {
        for url in urls {
            if Url::parse(url).is_err() {
                errors.push(ValidationError::InvalidInstanceUrl {
                    service: service.clone(),
                    url: url.clone(),
                });
            }
        }
    }

    let positive = [
        ("gateway.request_timeout_ms", config.gateway.request_timeout_ms),
        ("dispatcher.max_attempts", u64::from(config.dispatcher.max_attempts)),
        ("retries.max_attempts", u64::from(config.retries.max_attempts)),
        ("circuit_breaker.window_size", config.circuit_breaker.window_size as u64),
        ("circuit_breaker.minimum_calls", config.circuit_breaker.minimum_calls as u64),
        ("circuit_breaker.half_open_calls", u64::from(config.circuit_breaker.half_open_calls)),
        ("rate_limit.permits_per_period", u64::from(config.rate_limit.permits_per_period)),
        ("rate_limit.period_ms", config.rate_limit.period_ms),
        ("health_check.interval_ms", config.health_check.interval_ms),
        ("health_check.timeout_ms", config.health_check.timeout_ms),
        ("cache.ttl_secs", config.cache.ttl_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::MustBePositive { field });
        }
    }

    let rate = config.circuit_breaker.failure_rate_threshold;
    if !(rate > 0.0 && rate <= 100.0) {
        errors.push(ValidationError::FailureRateOutOfRange(rate));
    }

    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::HealthPathNotAbsolute(config.health_check.path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Legal but probably unintended setups, reported at startup as warnings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigWarning {
    #[error("no routes configured, every request will be answered with 404")]
    NoRoutes,

    #[error("route '{prefix}' points at service '{service}', which has no instances")]
    EmptyRouteTarget { prefix: String, service: String },
}

/// Non-fatal problems in an otherwise valid configuration.
pub fn config_warnings(config: &GatewayConfig) -> Vec<ConfigWarning> {
    if config.routes.is_empty() {
        return vec![ConfigWarning::NoRoutes];
    }
    config
        .routes
        .iter()
        .filter(|(_, service)| config.services.get(*service).is_some_and(Vec::is_empty))
        .map(|(prefix, service)| ConfigWarning::EmptyRouteTarget {
            prefix: prefix.clone(),
            service: service.clone(),
        })
        .collect()
}
