//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use service_gateway::config::{BackoffKind, GatewayConfig};
use service_gateway::load_balancer::ServerRegistry;
use service_gateway::{HttpServer, Shutdown};

/// Read one request head (and any declared body); return the request path.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut remaining = content_length.saturating_sub(buf.len() - head_end);
    while remaining > 0 {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        remaining = remaining.saturating_sub(n);
    }

    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request path and returns `(status, body)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(path) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(path).await;
                        let response = format!(
                            "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that always answers 200 with `response`.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (200, response.to_string()) }).await
}

/// An address nothing listens on.
pub fn dead_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

/// Config with fast retries, no rate limiting and no background probes.
pub fn test_config(service: &str, instances: &[SocketAddr]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.gateway.algorithm = "round-robin".to_string();
    config.gateway.request_timeout_ms = 500;
    config.retries.max_attempts = 1;
    config.retries.backoff = BackoffKind::Fixed;
    config.retries.base_delay_ms = 10;
    config.rate_limit.enabled = false;
    config.health_check.enabled = false;

    let mut services = BTreeMap::new();
    services.insert(service.to_string(), instances.iter().map(|a| url(*a)).collect());
    config.services = services;
    config
}

pub struct RunningGateway {
    pub addr: SocketAddr,
    pub registry: Arc<ServerRegistry>,
    pub shutdown: Shutdown,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the full HTTP gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> RunningGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let registry = server.registry();
    let shutdown = Shutdown::new();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningGateway {
        addr,
        registry,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
