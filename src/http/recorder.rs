//! Response status observation.
//!
//! [`StatusRecorder`] sits between a handler and the connection and notes the
//! status code of the response passing through it. The response itself is
//! forwarded untouched.

use axum::http::{Response, StatusCode};

/// Captures the status a handler chose for its response.
///
/// The first status set is the one kept; later calls are ignored. Until a
/// status is set the recorder reports `200 OK`, matching what the transport
/// sends when a handler never sets one explicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusRecorder {
    status: Option<StatusCode>,
}

impl StatusRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status` unless one was already recorded. Returns whether it was kept.
    pub fn set_status(&mut self, status: StatusCode) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.status = Some(status);
        true
    }

    /// Record the status of `response` and hand it back unchanged.
    pub fn observe<B>(&mut self, response: Response<B>) -> Response<B> {
        self.set_status(response.status());
        response
    }

    /// The observed status, or `200 OK` if none was set.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Whether a status has actually been observed.
    pub fn is_set(&self) -> bool {
        self.status.is_some()
    }
}
