//! Per-request access logging.
//!
//! Every request that enters [`logging_middleware`] produces exactly one log
//! line with its path, client identity and final status. The line is written
//! from a drop guard, so a request whose future is dropped early (client gone,
//! forced shutdown) is still logged, at `warn`.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::http::recorder::StatusRecorder;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve who sent the request, for logging only.
///
/// `X-Forwarded-For` is client-controlled, so this value must never feed an
/// access decision.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .filter(|value| !value.is_empty());

    match (forwarded, peer) {
        (Some(forwarded), _) => forwarded,
        (None, Some(peer)) => peer.to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Wraps a handler and logs the outcome of every request.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let mut entry = RequestLog {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        client: client_identity(request.headers(), peer),
        started: Instant::now(),
        recorder: StatusRecorder::new(),
    };

    let response = next.run(request).await;
    entry.recorder.observe(response)
}

struct RequestLog {
    method: Method,
    path: String,
    client: String,
    started: Instant,
    recorder: StatusRecorder,
}

impl Drop for RequestLog {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let status = self.recorder.status().as_u16();

        // The status is observed only once the handler has returned.
        if self.recorder.is_set() {
            tracing::info!(
                method = %self.method,
                path = %self.path,
                client = %self.client,
                status,
                elapsed_ms,
                "Handled request"
            );
        } else {
            tracing::warn!(
                method = %self.method,
                path = %self.path,
                client = %self.client,
                status,
                elapsed_ms,
                "Request dropped before completion"
            );
        }
    }
}
