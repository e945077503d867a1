//! Dispatcher failover against real sockets through the hyper transport.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use service_gateway::config::GatewayConfig;
use service_gateway::discovery::StaticDiscovery;
use service_gateway::dispatch::{Dispatcher, HyperTransport};
use service_gateway::load_balancer::ServerRegistry;
use service_gateway::GatewayError;

mod common;

const SERVICE: &str = "FEATURE-SERVICE";

fn dispatcher(config: &GatewayConfig) -> (Dispatcher, Arc<ServerRegistry>) {
    let registry = Arc::new(ServerRegistry::new());
    let dispatcher = Dispatcher::from_config(
        config,
        Arc::new(StaticDiscovery::new(config.services.clone())),
        registry.clone(),
        Arc::new(HyperTransport::new(config.gateway.max_body_bytes)),
    )
    .unwrap();
    (dispatcher, registry)
}

async fn get(dispatcher: &Dispatcher, path: &str) -> Result<Bytes, GatewayError> {
    dispatcher
        .forward(SERVICE, path, &Method::GET, &HeaderMap::new(), Bytes::new())
        .await
        .map(|response| response.body)
}

#[tokio::test]
async fn test_failover_to_healthy_instance() {
    let failing_calls = Arc::new(AtomicU32::new(0));
    let fc = failing_calls.clone();
    let failing = common::start_programmable_backend(move |_| {
        let fc = fc.clone();
        async move {
            fc.fetch_add(1, Ordering::SeqCst);
            (503, "unavailable".to_string())
        }
    })
    .await;
    let healthy = common::start_mock_backend("from healthy").await;

    let mut config = common::test_config(SERVICE, &[failing, healthy]);
    config.retries.max_attempts = 2;
    let (dispatcher, registry) = dispatcher(&config);

    // Round-robin starts with the failing instance.
    let body = get(&dispatcher, "/hello").await.unwrap();
    assert_eq!(body, "from healthy");

    // Retried once on the same instance before failing over.
    assert_eq!(failing_calls.load(Ordering::SeqCst), 2);

    let failing_instance = registry.get(&common::url(failing)).unwrap();
    assert!(!failing_instance.is_healthy());
    assert_eq!(failing_instance.active_connections(), 0);

    let healthy_instance = registry.get(&common::url(healthy)).unwrap();
    assert!(healthy_instance.is_healthy());
    assert_eq!(healthy_instance.active_connections(), 0);
    assert!(healthy_instance.avg_latency_ms() > 0.0);
}

#[tokio::test]
async fn test_unreachable_instance_fails_over() {
    let dead = common::dead_addr();
    let live = common::start_mock_backend("alive").await;

    let config = common::test_config(SERVICE, &[dead, live]);
    let (dispatcher, registry) = dispatcher(&config);

    assert_eq!(get(&dispatcher, "/").await.unwrap(), "alive");
    assert!(!registry.get(&common::url(dead)).unwrap().is_healthy());
}

#[tokio::test]
async fn test_all_instances_failing_exhausts_retries() {
    let a = common::start_programmable_backend(|_| async { (500, "boom".to_string()) }).await;
    let b = common::dead_addr();

    let config = common::test_config(SERVICE, &[a, b]);
    let (dispatcher, registry) = dispatcher(&config);

    match get(&dispatcher, "/hello").await.unwrap_err() {
        GatewayError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("unexpected error: {other:?}"),
    }

    // Both are now unhealthy, so the next request fails before any call.
    let err = get(&dispatcher, "/hello").await.unwrap_err();
    assert!(matches!(err, GatewayError::NoHealthyInstances { .. }));

    for addr in [a, b] {
        assert_eq!(registry.get(&common::url(addr)).unwrap().active_connections(), 0);
    }
}

#[tokio::test]
async fn test_client_error_is_not_failed_over() {
    let other_calls = Arc::new(AtomicU32::new(0));
    let oc = other_calls.clone();
    let not_found = common::start_programmable_backend(|_| async { (404, "{}".to_string()) }).await;
    let other = common::start_programmable_backend(move |_| {
        let oc = oc.clone();
        async move {
            oc.fetch_add(1, Ordering::SeqCst);
            (200, "other".to_string())
        }
    })
    .await;

    let config = common::test_config(SERVICE, &[not_found, other]);
    let (dispatcher, registry) = dispatcher(&config);

    let err = get(&dispatcher, "/missing").await.unwrap_err();
    assert!(matches!(err, GatewayError::UpstreamError { status: 404, .. }));
    assert_eq!(other_calls.load(Ordering::SeqCst), 0);
    assert!(registry.get(&common::url(not_found)).unwrap().is_healthy());
}

#[tokio::test]
async fn test_slow_instance_times_out_and_fails_over() {
    let slow = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_millis(800)).await;
        (200, "slow".to_string())
    })
    .await;
    let fast = common::start_mock_backend("fast").await;

    let mut config = common::test_config(SERVICE, &[slow, fast]);
    config.gateway.request_timeout_ms = 200;
    let (dispatcher, registry) = dispatcher(&config);

    assert_eq!(get(&dispatcher, "/").await.unwrap(), "fast");
    assert!(!registry.get(&common::url(slow)).unwrap().is_healthy());
}

#[tokio::test]
async fn test_concurrent_requests_release_connections() {
    let a = common::start_mock_backend("a").await;
    let b = common::start_mock_backend("b").await;

    let mut config = common::test_config(SERVICE, &[a, b]);
    config.gateway.algorithm = "least-connections".to_string();
    let (dispatcher, registry) = dispatcher(&config);
    let dispatcher = Arc::new(dispatcher);

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { get(&dispatcher, "/").await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    for addr in [a, b] {
        assert_eq!(registry.get(&common::url(addr)).unwrap().active_connections(), 0);
    }
}
