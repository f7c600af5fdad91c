//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use echo_server::config::{ListenerConfig, ServerConfig};
use echo_server::http::HttpServer;
use echo_server::lifecycle::{LifecycleStatus, ServerLifecycle, Shutdown, ShutdownError};
use echo_server::observability::metrics::PrometheusMetrics;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A server running on an ephemeral local port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub status: LifecycleStatus,
    pub handle: JoinHandle<Result<(), ShutdownError>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Config bound to 127.0.0.1:0 with latency injection off.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.echo.latency.enabled = false;
    config
}

/// Serve `router` under a fresh lifecycle.
pub async fn spawn_router(router: Router, grace_period: Duration) -> RunningServer {
    let listener = ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
        max_connections: 1_000,
    };
    let lifecycle = ServerLifecycle::start(&listener, grace_period, router)
        .await
        .unwrap();

    RunningServer {
        addr: lifecycle.local_addr(),
        shutdown: lifecycle.shutdown_handle(),
        status: lifecycle.status(),
        handle: tokio::spawn(lifecycle.run()),
    }
}

/// Serve the full application built from `config`.
pub async fn spawn_app(config: ServerConfig, metrics: Option<PrometheusMetrics>) -> RunningServer {
    let grace_period = config.shutdown.grace_period();
    spawn_router(HttpServer::new(config, metrics).into_router(), grace_period).await
}

/// Client that never reuses connections or honours proxy env vars.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Start a mock downstream answering every request with `status_line` and
/// `body`. With `echo_head` the body is the raw request head instead.
pub async fn start_mock_backend(status_line: &'static str, body: &'static str, echo_head: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let payload = if echo_head { head } else { body.to_string() };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nX-Backend: mock\r\nConnection: close\r\n\r\n{}",
                            status_line,
                            payload.len(),
                            payload
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

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
