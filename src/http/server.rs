//! HTTP application setup.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (access logging, panic recovery)
//! - Build the shared, read-only application state
//!
//! Serving the router on a socket is the job of
//! [`crate::lifecycle::ServerLifecycle`].

use std::sync::Arc;

use axum::{
    middleware,
    routing::{any, get},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::ServerConfig;
use crate::http::handlers;
use crate::http::latency::LatencyInjector;
use crate::http::middleware::logging_middleware;
use crate::http::relay;
use crate::observability::metrics::{MetricsSink, NoopMetrics, PrometheusMetrics};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub metrics: Arc<dyn MetricsSink>,
    pub latency: Arc<LatencyInjector>,
    pub downstream: reqwest::Client,
}

impl AppState {
    pub fn new(config: ServerConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        let latency = Arc::new(LatencyInjector::new(&config.echo.latency));
        Self {
            config: Arc::new(config),
            metrics,
            latency,
            downstream: reqwest::Client::new(),
        }
    }
}

/// The routed application.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Build the application. Without `prometheus` the server records no
    /// metrics and does not expose `/metrics`.
    pub fn new(config: ServerConfig, prometheus: Option<PrometheusMetrics>) -> Self {
        let sink: Arc<dyn MetricsSink> = match &prometheus {
            Some(metrics) => Arc::new(metrics.clone()),
            None => Arc::new(NoopMetrics),
        };
        let state = AppState::new(config, sink);
        Self {
            router: Self::build_router(state, prometheus),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, prometheus: Option<PrometheusMetrics>) -> Router {
        let mut logged = Router::new()
            .route("/healthz", any(handlers::healthz))
            .route("/notfound", any(handlers::not_found));

        if state.config.relay.enabled {
            logged = logged.route("/tracing", any(relay::relay));
        }

        let logged = logged
            .route("/", any(handlers::echo))
            .fallback(handlers::echo)
            .with_state(state)
            .layer(CatchPanicLayer::new())
            .layer(middleware::from_fn(logging_middleware));

        match prometheus {
            Some(metrics) => logged.merge(
                Router::new()
                    .route("/metrics", get(handlers::metrics))
                    .with_state(metrics),
            ),
            None => logged,
        }
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}
