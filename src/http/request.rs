//! Request identification.
//!
//! # Responsibilities
//! - Assign a UUID v4 `x-request-id` to every inbound request that lacks one
//! - Echo it on the response and forward it upstream
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer) for tracing
//! - An ID supplied by the client is kept as-is

use axum::http::{HeaderMap, HeaderName};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: &str = "x-request-id";

fn header_name() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Layer that fills in a missing request ID.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(header_name(), MakeRequestUuid)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(header_name())
}

/// The request ID carried in `headers`, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}
