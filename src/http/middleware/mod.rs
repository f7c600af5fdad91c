//! Request middleware.
//!
//! # Data Flow
//! ```text
//! Request
//!     → logging.rs (resolve client identity, start clock)
//!     → catch-panic layer → handler
//!     → StatusRecorder observes the response
//!     → logging.rs emits one line
//! ```

pub mod logging;

pub use logging::{client_identity, logging_middleware};
