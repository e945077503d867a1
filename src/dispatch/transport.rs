//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Perform one request against one instance URL, bounded by a timeout
//! - Strip hop-by-hop headers in both directions
//! - Buffer the upstream body so it can be cached and replayed
//! - Map non-2xx answers to `UpstreamError`, network failures to `Transport`

use std::time::Duration;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use crate::error::{GatewayError, GatewayResult};
use crate::resilience::timeouts::with_timeout;

const USER_AGENT: &str = concat!("service-gateway/", env!("CARGO_PKG_VERSION"));

/// Headers that describe a single hop and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
    header::CONTENT_LENGTH,
];

/// Copy `headers` without hop-by-hop entries.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !HOP_BY_HOP.contains(name) && name.as_str() != "keep-alive" {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// One outbound call.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub timeout: Duration,
}

impl OutboundRequest {
    /// Bodiless GET, used by health probes.
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            timeout,
        }
    }
}

/// A fully buffered upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayResponse {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Something that can carry a request to an instance.
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    fn perform(&self, request: OutboundRequest) -> BoxFuture<'_, GatewayResult<GatewayResponse>>;
}

/// Transport backed by the hyper-util pooled client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl HyperTransport {
    pub fn new(max_body_bytes: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            max_body_bytes,
        }
    }

    async fn send(&self, request: OutboundRequest) -> GatewayResult<GatewayResponse> {
        let url = request.url;
        let transport_error = |message: String| GatewayError::Transport {
            url: url.clone(),
            message,
        };

        let mut builder = Request::builder().method(request.method).uri(url.as_str());
        if let Some(headers) = builder.headers_mut() {
            *headers = strip_hop_by_hop(&request.headers);
            headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        }
        let outbound = builder
            .body(Body::from(request.body))
            .map_err(|e| transport_error(e.to_string()))?;

        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| transport_error(e.to_string()))?;

        let (parts, body) = response.into_parts();
        if !parts.status.is_success() {
            return Err(GatewayError::UpstreamError {
                url: url.clone(),
                status: parts.status.as_u16(),
            });
        }

        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| transport_error(e.to_string()))?;

        Ok(GatewayResponse {
            status: parts.status,
            headers: strip_hop_by_hop(&parts.headers),
            body,
        })
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl HttpTransport for HyperTransport {
    fn perform(&self, request: OutboundRequest) -> BoxFuture<'_, GatewayResult<GatewayResponse>> {
        Box::pin(async move {
            let url = request.url.clone();
            let timeout = request.timeout;
            with_timeout(&url, timeout, self.send(request)).await
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::HOST, HeaderValue::from_static("gateway:8080"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));

        let stripped = strip_hop_by_hop(&headers);
        assert_eq!(stripped.len(), 2);
        assert_eq!(stripped[header::ACCEPT], "application/json");
        assert_eq!(stripped["x-request-id"], "abc");
    }

    #[tokio::test]
    async fn test_unreachable_instance_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HyperTransport::new(1024);
        let err = transport
            .perform(OutboundRequest::get(format!("http://{}/", addr), Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
        assert!(err.is_transient());
    }
}
