//! Header classification shared by the echo and relay handlers.

use axum::http::{header, HeaderMap, HeaderName};

/// Hop-by-hop headers: meaningful for a single connection only.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Headers that describe how a message is framed on the wire. Copying them
/// onto a response with a different body would corrupt it.
pub fn is_framing(name: &HeaderName) -> bool {
    is_hop_by_hop(name) || *name == header::CONTENT_LENGTH
}

/// Remove framing headers in place.
pub fn strip_framing(headers: &mut HeaderMap) {
    let framing: Vec<HeaderName> = headers.keys().filter(|name| is_framing(name)).cloned().collect();
    for name in framing {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_framing_headers() {
        assert!(is_framing(&header::CONTENT_LENGTH));
        assert!(is_framing(&HeaderName::from_static("keep-alive")));
        assert!(!is_framing(&header::USER_AGENT));
        assert!(!is_hop_by_hop(&header::CONTENT_LENGTH));
    }

    #[test]
    fn strips_only_framing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert(header::CONTENT_LENGTH, "12".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());

        strip_framing(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }
}
