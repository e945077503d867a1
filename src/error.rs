//! Routing error taxonomy.
//!
//! Every failure the routing core can report to a caller is a
//! [`GatewayError`]. Nothing on the request path panics; the HTTP layer
//! turns these into `{status, message}` responses.

use std::time::Duration;
use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by the dispatcher and the resilience layer.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Discovery returned no instances for the service.
    #[error("no instances registered for service {service}")]
    NoInstances { service: String },

    /// Every known instance of the service is marked unhealthy.
    #[error("no healthy instances for service {service}")]
    NoHealthyInstances { service: String },

    /// The selection strategy returned nothing despite healthy candidates.
    #[error("load balancer failed to select an instance for service {service}")]
    SelectionFailed { service: String },

    /// No rate limiter permit was available within the wait bound.
    #[error("rate limit exceeded for {target}")]
    RateLimited { target: String },

    /// The circuit breaker for the target is open.
    #[error("circuit breaker for {target} is open; retry after {retry_after:?}")]
    CircuitOpen { target: String, retry_after: Duration },

    /// The upstream did not answer within the per-call timeout.
    #[error("upstream {url} timed out after {timeout:?}")]
    UpstreamTimeout { url: String, timeout: Duration },

    /// The upstream answered with a non-2xx status.
    #[error("upstream {url} returned status {status}")]
    UpstreamError { url: String, status: u16 },

    /// The upstream could not be reached at all.
    #[error("upstream {url} unreachable: {message}")]
    Transport { url: String, message: String },

    /// The dispatcher spent its failover budget.
    #[error("all {attempts} attempts for service {service} failed; last error: {last}")]
    RetriesExhausted {
        service: String,
        attempts: u32,
        last: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Errors worth retrying against the same target: network failures,
    /// timeouts and 5xx answers.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport { .. } | GatewayError::UpstreamTimeout { .. } => true,
            GatewayError::UpstreamError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Guard rejections: the call never reached the network.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. } | GatewayError::CircuitOpen { .. }
        )
    }

    /// HTTP status reported to the gateway's caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamError { status, .. } if *status < 500 => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::UpstreamError { .. } | GatewayError::Transport { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::NoInstances { .. }
            | GatewayError::NoHealthyInstances { .. }
            | GatewayError::SelectionFailed { .. }
            | GatewayError::CircuitOpen { .. }
            | GatewayError::RetriesExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NoInstances { .. } => "no_instances",
            GatewayError::NoHealthyInstances { .. } => "no_healthy_instances",
            GatewayError::SelectionFailed { .. } => "selection_failed",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::CircuitOpen { .. } => "circuit_open",
            GatewayError::UpstreamTimeout { .. } => "upstream_timeout",
            GatewayError::UpstreamError { .. } => "upstream_error",
            GatewayError::Transport { .. } => "transport",
            GatewayError::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

/// Result type for routing operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
