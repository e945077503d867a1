//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the routing core (registry, dispatcher, cache, health monitor)
//! - Create the Axum router with the gateway and admin handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve until the shutdown coordinator fires

use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use crate::admin;
use crate::cache::ResponseCache;
use crate::config::{config_warnings, GatewayConfig};
use crate::discovery::{Discovery, StaticDiscovery};
use crate::dispatch::{Dispatcher, HttpTransport, HyperTransport};
use crate::health::HealthMonitor;
use crate::http::request;
use crate::http::response::error_response;
use crate::lifecycle::{Shutdown, StartupError};
use crate::load_balancer::ServerRegistry;
use crate::observability::metrics;
use crate::routing::ServiceRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ServiceRouter>,
    pub dispatcher: Arc<Dispatcher>,
    pub cache: Arc<ResponseCache>,
    pub config: Arc<GatewayConfig>,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    app: Router,
    state: AppState,
    monitor: HealthMonitor,
}

impl HttpServer {
    /// Build the gateway with static discovery and the hyper transport.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let discovery = Arc::new(StaticDiscovery::new(config.services.clone()));
        let transport = Arc::new(HyperTransport::new(config.gateway.max_body_bytes));
        Self::with_parts(config, discovery, transport)
    }

    /// Build the gateway around caller-supplied discovery and transport.
    pub fn with_parts(
        config: GatewayConfig,
        discovery: Arc<dyn Discovery>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, StartupError> {
        let registry = Arc::new(ServerRegistry::new());
        let dispatcher = Dispatcher::from_config(
            &config,
            discovery.clone(),
            registry.clone(),
            transport.clone(),
        )?;
        tracing::info!(
            algorithm = dispatcher.strategy().algorithm().name(),
            services = config.services.len(),
            routes = config.routes.len(),
            "Routing core initialized"
        );
        for warning in config_warnings(&config) {
            tracing::warn!(%warning, "Configuration warning");
        }

        let monitor = HealthMonitor::new(
            discovery,
            registry,
            transport,
            config.health_check.clone(),
            config.gateway.service_name.clone(),
        );

        let state = AppState {
            router: Arc::new(ServiceRouter::new(&config.routes)),
            dispatcher: Arc::new(dispatcher),
            cache: Arc::new(ResponseCache::from_config(&config.cache)),
            config: Arc::new(config),
        };
        let app = Self::build_router(state.clone());

        Ok(Self {
            app,
            state,
            monitor,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let timeout = overall_timeout(&state.config);
        let mut router = Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler));
        if state.config.admin.enabled {
            router = router.merge(admin::setup_admin_router(state.clone()));
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(request::set_request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(request::propagate_request_id_layer())
                .layer(TimeoutLayer::new(timeout)),
        )
    }

    pub fn registry(&self) -> Arc<ServerRegistry> {
        self.state.dispatcher.registry().clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let monitor = self.monitor.spawn(shutdown.subscribe());

        axum::serve(listener, self.app)
            .with_graceful_shutdown(Shutdown::wait(shutdown.subscribe()))
            .await?;

        if let Err(e) = monitor.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Upper bound for one inbound request: every failover and retry attempt
/// at the per-call timeout, the longest backoff including jitter, and a
/// full rate-limit wait per instance tried.
fn overall_timeout(config: &GatewayConfig) -> Duration {
    let instances = config.dispatcher.max_attempts.max(1);
    let calls = instances * config.retries.max_attempts.max(1);
    let per_call = config.gateway.request_timeout();
    let longest_delay = config.retries.base_delay_ms.max(config.retries.max_delay_ms);
    // Jitter adds at most a tenth of the delay.
    let backoff = Duration::from_millis(longest_delay + longest_delay / 10);
    let limiter_wait = if config.rate_limit.enabled {
        Duration::from_millis(config.rate_limit.wait_timeout_ms)
    } else {
        Duration::ZERO
    };
    (per_call + backoff) * calls + limiter_wait * instances
}

/// Resolve the service prefix, then serve from cache or dispatch.
async fn gateway_handler(State(state): State<AppState>, req: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = req.into_parts();
    let request_id = request::request_id(&parts.headers).to_string();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");

    let route = match state.router.resolve(path_and_query) {
        Ok(route) => route,
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %path_and_query, error = %e, "No route matched");
            let response = e.into_response();
            metrics::record_request("none", parts.method.as_str(), response.status().as_u16(), start);
            return response;
        }
    };

    let body = match axum::body::to_bytes(body, state.config.gateway.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        service = %route.service,
        path = %route.path,
        "Routing request"
    );

    let dispatcher = &state.dispatcher;
    let result = state
        .cache
        .get_or_forward(&route.service, &parts.method, &route.path, || {
            dispatcher.forward(&route.service, &route.path, &parts.method, &parts.headers, body)
        })
        .await;

    let response = match result {
        Ok(upstream) => upstream.into_response(),
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                service = %route.service,
                kind = e.kind(),
                error = %e,
                "Request failed"
            );
            e.into_response()
        }
    };
    metrics::record_request(&route.service, parts.method.as_str(), response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackoffKind, DispatcherConfig, RateLimitConfig, RetryConfig};

    fn timeout_config(backoff: BackoffKind, base_delay_ms: u64, rate_limited: bool) -> GatewayConfig {
        GatewayConfig {
            dispatcher: DispatcherConfig { max_attempts: 2 },
            retries: RetryConfig {
                max_attempts: 3,
                backoff,
                base_delay_ms,
                max_delay_ms: 1_000,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limited,
                wait_timeout_ms: 500,
                ..RateLimitConfig::default()
            },
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn test_overall_timeout_covers_every_attempt() {
        let config = timeout_config(BackoffKind::Exponential, 100, false);
        // 2 instances * 3 attempts * (5s call + 1.1s jittered backoff)
        assert_eq!(overall_timeout(&config), Duration::from_millis(36_600));
    }

    #[test]
    fn test_overall_timeout_uses_fixed_delay_above_cap() {
        let config = timeout_config(BackoffKind::Fixed, 2_000, false);
        // Fixed backoff sleeps base_delay_ms even when it exceeds max_delay_ms.
        assert_eq!(overall_timeout(&config), Duration::from_millis(6 * (5_000 + 2_200)));
    }

    #[test]
    fn test_overall_timeout_includes_rate_limit_wait() {
        let config = timeout_config(BackoffKind::Exponential, 100, true);
        assert_eq!(overall_timeout(&config), Duration::from_millis(36_600 + 2 * 500));
    }

    #[test]
    fn test_unknown_algorithm_fails_startup() {
        let mut config = GatewayConfig::default();
        config.gateway.algorithm = "weighted".to_string();
        let err = HttpServer::new(config).err().unwrap();
        assert!(matches!(err, StartupError::Algorithm(_)));
    }
}
