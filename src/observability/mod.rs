//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request path:
//!     → logging.rs (structured log events, one line per request)
//!     → metrics.rs (ExecutionTimer → MetricsSink → latency histogram)
//!
//! Consumers:
//!     → stdout (text or JSON)
//!     → /metrics (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing
//! - The metrics sink is injected, not global
//! - Instrumentation failures never fail a request

pub mod logging;
pub mod metrics;
