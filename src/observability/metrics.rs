//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the execution latency histogram
//! - Record observations through an injected [`MetricsSink`]
//! - Expose a Prometheus-compatible rendering for `/metrics`
//!
//! # Metrics
//! - `httpserver_execution_latency_seconds` (histogram, label `step`)
//!
//! # Design Decisions
//! - No global recorder: the Prometheus recorder is owned by
//!   [`PrometheusMetrics`] and handed to whoever needs it
//! - The recorder's storage is atomic, so observations from concurrent
//!   requests need no extra locking
//! - Recording never fails the request path; errors are logged by the timer

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::Unit;
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use thiserror::Error;

pub const NAMESPACE: &str = "httpserver";
pub const EXECUTION_LATENCY: &str = "httpserver_execution_latency_seconds";

/// Step label used by [`ExecutionTimer::observe_total`].
pub const TOTAL_STEP: &str = "total";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to build prometheus recorder: {0}")]
    Build(#[from] BuildError),
    #[error("step label must not be empty")]
    EmptyStep,
}

/// Destination for duration observations.
pub trait MetricsSink: Send + Sync {
    /// Record one observation of `elapsed` under the label `step`.
    fn observe(&self, step: &str, elapsed: Duration) -> Result<(), MetricsError>;
}

/// Sink used when metrics are disabled or failed to register.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn observe(&self, _step: &str, _elapsed: Duration) -> Result<(), MetricsError> {
        Ok(())
    }
}

/// Exponential buckets: `count` bounds starting at `start`, each `factor` times the previous.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    std::iter::successors(Some(start), |bound| Some(bound * factor))
        .take(count)
        .collect()
}

/// Latency histogram backed by a locally owned Prometheus recorder.
#[derive(Clone)]
pub struct PrometheusMetrics {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
}

impl PrometheusMetrics {
    /// Build the recorder and describe the latency histogram.
    pub fn register() -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(EXECUTION_LATENCY.to_string()),
                &exponential_buckets(0.001, 2.0, 15),
            )?
            .build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            metrics::describe_histogram!(EXECUTION_LATENCY, Unit::Seconds, "Time spent.");
        });

        Ok(Self {
            recorder: Arc::new(recorder),
            handle,
        })
    }

    /// Render every recorded metric in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Drain histogram buffers. Call periodically.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }
}

impl MetricsSink for PrometheusMetrics {
    fn observe(&self, step: &str, elapsed: Duration) -> Result<(), MetricsError> {
        if step.is_empty() {
            return Err(MetricsError::EmptyStep);
        }
        metrics::with_local_recorder(self.recorder.as_ref(), || {
            metrics::histogram!(EXECUTION_LATENCY, "step" => step.to_owned())
                .record(elapsed.as_secs_f64());
        });
        Ok(())
    }
}

/// Spawn the periodic upkeep task for a Prometheus sink.
pub fn spawn_upkeep(metrics: PrometheusMetrics, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            metrics.run_upkeep();
        }
    })
}

/// Measures a unit of work and reports it to a [`MetricsSink`].
///
/// Usual pattern: `start` → work → `observe_step` … → `observe_total`.
/// `observe_total` is not idempotent; use [`ExecutionTimer::observe_total_on_drop`]
/// to report exactly once on every exit path.
pub struct ExecutionTimer {
    sink: Arc<dyn MetricsSink>,
    start: Instant,
    last: Instant,
}

impl ExecutionTimer {
    pub fn start(sink: Arc<dyn MetricsSink>) -> Self {
        let now = Instant::now();
        Self {
            sink,
            start: now,
            last: now,
        }
    }

    /// Time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Report the time since the previous step (or start) under `step`.
    pub fn observe_step(&mut self, step: &str) {
        let now = Instant::now();
        self.report(step, now.duration_since(self.last));
        self.last = now;
    }

    /// Report the time since start under `"total"`.
    pub fn observe_total(&self) {
        self.report(TOTAL_STEP, self.elapsed());
    }

    pub fn observe_total_on_drop(self) -> TotalOnDrop {
        TotalOnDrop(self)
    }

    fn report(&self, step: &str, elapsed: Duration) {
        if let Err(e) = self.sink.observe(step, elapsed) {
            tracing::warn!(step, error = %e, "Failed to record execution time");
        }
    }
}

/// Scoped [`ExecutionTimer`]; reports the total when dropped.
pub struct TotalOnDrop(ExecutionTimer);

impl std::ops::Deref for TotalOnDrop {
    type Target = ExecutionTimer;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for TotalOnDrop {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Drop for TotalOnDrop {
    fn drop(&mut self) {
        self.0.observe_total();
    }
}
