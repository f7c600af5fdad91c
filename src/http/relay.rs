//! Downstream relay for `/tracing`.
//!
//! Issues one GET against the configured downstream, carrying the inbound
//! headers, and writes the downstream response back as received.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::headers::{is_hop_by_hop, strip_framing};
use crate::http::server::AppState;

/// Inbound headers to forward. Names are already lower-case.
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for (name, value) in inbound {
        if *name == header::HOST || *name == header::CONTENT_LENGTH || is_hop_by_hop(name) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

pub async fn relay(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let url = &state.config.relay.downstream_url;

    let upstream = match state
        .downstream
        .get(url.as_str())
        .headers(forwarded_headers(&headers))
        .send()
        .await
    {
        Ok(upstream) => upstream,
        Err(e) => return downstream_failed(url, &e),
    };

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    strip_framing(&mut response_headers);

    let body = match upstream.bytes().await {
        Ok(body) => body,
        Err(e) => return downstream_failed(url, &e),
    };

    tracing::info!(url = %url, status = status.as_u16(), "Downstream request succeeded");

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

fn downstream_failed(url: &str, error: &reqwest::Error) -> Response {
    tracing::error!(url = %url, error = %error, "Downstream request failed");
    (StatusCode::BAD_GATEWAY, "Downstream request failed\n").into_response()
}
