//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers once, at startup
//! - Translate the first signal into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Signals after the first are logged and ignored; the grace period, not a
//!   second Ctrl+C, bounds how long shutdown takes

use crate::lifecycle::shutdown::Shutdown;

/// Registered termination signal streams.
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    /// Install the handlers. From here on the signals no longer kill the
    /// process by default.
    #[cfg(unix)]
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next signal and return its name.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Option<&'static str> {
        tokio::select! {
            received = self.interrupt.recv() => received.map(|()| "SIGINT"),
            received = self.terminate.recv() => received.map(|()| "SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Option<&'static str> {
        tokio::signal::ctrl_c().await.ok().map(|()| "CTRL_C")
    }
}

/// Turn termination signals into shutdown triggers until the streams close.
pub async fn watch(mut signals: TerminationSignals, shutdown: Shutdown) {
    while let Some(signal) = signals.recv().await {
        if shutdown.trigger() {
            tracing::info!(signal, "Termination signal received, shutting down");
        } else {
            tracing::info!(signal, "Shutdown already in progress, ignoring signal");
        }
    }
}
