//! HTTP header echo service.
//!
//! Echoes request headers back as JSON, optionally after an artificial delay,
//! relays `/tracing` to a downstream service, and exposes `/healthz` and
//! `/metrics`. The interesting part is the request lifecycle: status capture,
//! one log line per request, latency observation, and a bounded graceful
//! shutdown driven by SIGINT/SIGTERM.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{ServerLifecycle, Shutdown};
