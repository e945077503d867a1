//! Response construction.
//!
//! # Responsibilities
//! - Replay a buffered upstream response to the client
//! - Map gateway and routing errors to `{status, message}` JSON bodies
//!
//! # Design Decisions
//! - Upstream 4xx statuses pass through; everything else is decided by
//!   `GatewayError::status_code`
//! - Hop-by-hop headers were already stripped by the transport

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use crate::dispatch::GatewayResponse;
use crate::error::GatewayError;
use crate::routing::RouteError;

/// JSON error body returned by the gateway itself.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        status: status.as_u16(),
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.to_string())
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status = match self {
            RouteError::MissingPrefix => StatusCode::BAD_REQUEST,
            RouteError::UnknownService(_) => StatusCode::NOT_FOUND,
        };
        error_response(status, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_gateway_error_body() {
        let response = GatewayError::NoHealthyInstances { service: "FEATURE-SERVICE".into() }
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["status"], 503);
        assert_eq!(json["message"], "no healthy instances for service FEATURE-SERVICE");
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let timeout = GatewayError::UpstreamTimeout {
            url: "http://a".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(timeout.into_response().status(), StatusCode::GATEWAY_TIMEOUT);

        let not_found = GatewayError::UpstreamError { url: "http://a".into(), status: 404 };
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let exhausted = GatewayError::RetriesExhausted {
            service: "S".into(),
            attempts: 3,
            last: Box::new(GatewayError::UpstreamError { url: "http://a".into(), status: 500 }),
        };
        assert_eq!(exhausted.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_route_errors() {
        assert_eq!(RouteError::MissingPrefix.into_response().status(), StatusCode::BAD_REQUEST);
        let response = RouteError::UnknownService("orders".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "Unknown service: orders");
    }

    #[tokio::test]
    async fn test_gateway_response_replay() {
        let mut upstream = GatewayResponse::ok("hello");
        upstream.status = StatusCode::CREATED;
        upstream.headers.insert("x-upstream", "1".parse().unwrap());

        let response = upstream.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-upstream"], "1");
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(bytes, "hello");
    }
}
