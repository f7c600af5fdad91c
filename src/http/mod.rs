//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection (lifecycle::server)
//!     → server.rs (Axum router, shared AppState)
//!     → middleware/logging.rs (client identity, one log line per request)
//!     → recorder.rs (observe the status leaving the handler)
//!     → handlers.rs / relay.rs (echo, healthz, notfound, tracing, metrics)
//!     → Send to client
//! ```

pub mod handlers;
pub mod headers;
pub mod latency;
pub mod middleware;
pub mod recorder;
pub mod relay;
pub mod server;

pub use recorder::StatusRecorder;
pub use server::{AppState, HttpServer};
