//! Request handlers: echo, health, not-found and metrics exposition.

use std::collections::BTreeMap;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::http::headers::is_framing;
use crate::http::server::AppState;
use crate::observability::metrics::{ExecutionTimer, PrometheusMetrics};

pub const VERSION: HeaderName = HeaderName::from_static("version");

/// Failures while building the echo response. All map to 500.
#[derive(Debug, Error)]
pub enum EchoError {
    #[error("header `{0}` is not valid UTF-8")]
    NonUtf8Header(String),
    #[error("header `{0}` cannot be mirrored")]
    InvalidHeader(String),
    #[error("version value cannot be sent as a header")]
    InvalidVersion,
    #[error("failed to serialize headers: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for EchoError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Echo failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "failed to echo headers\n").into_response()
    }
}

/// Echo the request headers back, after an optional artificial delay.
pub async fn echo(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, EchoError> {
    let mut timer = ExecutionTimer::start(state.metrics.clone()).observe_total_on_drop();

    if state.latency.inject().await.is_some() {
        timer.observe_step("delay");
    }

    let version = std::env::var(&state.config.echo.version_var).unwrap_or_default();
    echo_response(&headers, &version)
}

/// Build the echo response for `headers`.
///
/// The body is a JSON object of header name to values in arrival order. Each
/// header is mirrored onto the response with its values comma-joined.
pub fn echo_response(headers: &HeaderMap, version: &str) -> Result<Response, EchoError> {
    let mut echoed: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut mirrored = HeaderMap::new();

    for name in headers.keys() {
        let mut values = Vec::new();
        let mut joined = Vec::new();
        for (i, value) in headers.get_all(name).iter().enumerate() {
            let text = std::str::from_utf8(value.as_bytes())
                .map_err(|_| EchoError::NonUtf8Header(name.to_string()))?;
            values.push(text);
            if i > 0 {
                joined.push(b',');
            }
            joined.extend_from_slice(value.as_bytes());
        }
        echoed.insert(name.as_str(), values);

        if !is_framing(name) {
            let value = HeaderValue::from_bytes(&joined)
                .map_err(|_| EchoError::InvalidHeader(name.to_string()))?;
            mirrored.append(name.clone(), value);
        }
    }

    let version = HeaderValue::from_bytes(version.as_bytes()).map_err(|_| EchoError::InvalidVersion)?;
    mirrored.insert(VERSION, version);
    mirrored.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let body = serde_json::to_vec(&echoed)?;
    let mut response = Response::new(Body::from(body));
    *response.headers_mut() = mirrored;
    Ok(response)
}

pub async fn healthz() -> &'static str {
    "ok\n"
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}

pub async fn metrics(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    async fn body_json(response: Response) -> HashMap<String, Vec<String>> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn body_round_trips_header_values() {
        let mut headers = HeaderMap::new();
        headers.append("x-multi", "a".parse().unwrap());
        headers.append("x-multi", "b".parse().unwrap());
        headers.insert("accept", "*/*".parse().unwrap());

        let response = echo_response(&headers, "v1").unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body.len(), 2);
        assert_eq!(body["x-multi"], ["a", "b"]);
        assert_eq!(body["accept"], ["*/*"]);
    }

    #[test]
    fn mirrors_headers_with_joined_values() {
        let mut headers = HeaderMap::new();
        headers.append("x-multi", "a".parse().unwrap());
        headers.append("x-multi", "b".parse().unwrap());
        headers.insert("x-single", "c".parse().unwrap());

        let response = echo_response(&headers, "v1").unwrap();
        let out = response.headers();

        assert_eq!(out.get_all("x-multi").iter().count(), 1);
        assert_eq!(out["x-multi"], "a,b");
        assert_eq!(out["x-single"], "c");
        assert_eq!(out[VERSION], "v1");
        assert_eq!(out[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn inbound_content_type_and_framing_are_not_mirrored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        headers.insert(header::CONTENT_LENGTH, "42".parse().unwrap());
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());

        let response = echo_response(&headers, "").unwrap();
        let out = response.headers();

        assert_eq!(out.get_all(header::CONTENT_TYPE).iter().count(), 1);
        assert_eq!(out[header::CONTENT_TYPE], "application/json");
        assert!(!out.contains_key(header::CONTENT_LENGTH));
        assert!(!out.contains_key(header::CONNECTION));
        assert_eq!(out[VERSION], "");
    }

    #[test]
    fn non_utf8_header_is_an_error() {
        let mut headers = HeaderMap::new();
        headers.insert("x-bin", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());

        let err = echo_response(&headers, "v1").unwrap_err();
        assert!(matches!(err, EchoError::NonUtf8Header(name) if name == "x-bin"));
        assert_eq!(
            EchoError::InvalidVersion.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unrepresentable_version_is_an_error() {
        assert!(matches!(
            echo_response(&HeaderMap::new(), "bad\nvalue"),
            Err(EchoError::InvalidVersion)
        ));
    }
}
