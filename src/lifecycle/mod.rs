//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (server.rs):
//!     Bind listener → Starting → Serving
//!
//! Shutdown (shutdown.rs + server.rs):
//!     Trigger → stop accepting → drain (bounded by grace period) → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown once; repeats ignored
//! ```
//!
//! # Design Decisions
//! - Bind failure is fatal and never retried
//! - Shutdown has a deadline: connections still open after it are aborted
//! - State only moves forward (state.rs)

pub mod server;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use server::{ServerLifecycle, ShutdownError, StartupError};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::TerminationSignals;
pub use state::{LifecycleState, LifecycleStatus};
