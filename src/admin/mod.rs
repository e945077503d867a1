//! Admin API: live view of the registry, behind a bearer token.

pub mod auth;
pub mod handlers;

use axum::{
    routing::get,
    Router,
    middleware,
};
use crate::http::server::AppState;
use self::handlers::*;
use self::auth::admin_auth_middleware;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
