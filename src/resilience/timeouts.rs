//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap outbound calls and health probes with a deadline
//! - Cancel only the timed-out call, never the surrounding cycle or chain
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;
use crate::error::{GatewayError, GatewayResult};

/// Run `fut` with a deadline, mapping expiry to `UpstreamTimeout`.
pub async fn with_timeout<T, F>(url: &str, timeout: Duration, fut: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::UpstreamTimeout {
            url: url.to_string(),
            timeout,
        }),
    }
}
