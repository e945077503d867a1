use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use crate::http::server::AppState;

/// Require `Authorization: Bearer <admin.api_key>`.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected = format!("Bearer {}", state.config.admin.api_key);

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|value| value == expected);

    if authorized {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request");
        Err(StatusCode::UNAUTHORIZED)
    }
}
