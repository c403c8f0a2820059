use crate::codec::ENCODING_GZIP;
use http::header::{self, HeaderMap};

/// Returns whether compression negotiation applies to a request at all.
///
/// `response` holds whatever headers were set upstream before this middleware
/// ran. This check never mutates anything.
pub fn is_eligible(request: &HeaderMap, response: &HeaderMap) -> bool {
    request_is_eligible(request) && !is_already_encoded(response)
}

/// The request half of [`is_eligible`].
pub fn request_is_eligible(request: &HeaderMap) -> bool {
    if !accepts_gzip(request) {
        tracing::trace!("client does not accept gzip, skipping compression");
        return false;
    }

    // Compressing the upgrade response breaks the WebSocket handshake.
    if is_websocket_handshake(request) {
        tracing::trace!("websocket handshake, skipping compression");
        return false;
    }

    true
}

/// Checks whether the response already declares gzip as its content encoding.
pub fn is_already_encoded(response: &HeaderMap) -> bool {
    response
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case(ENCODING_GZIP))
}

fn accepts_gzip(request: &HeaderMap) -> bool {
    request
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(ENCODING_GZIP))
}

fn is_websocket_handshake(request: &HeaderMap) -> bool {
    request
        .get(header::SEC_WEBSOCKET_KEY)
        .is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers<I>(pairs: I) -> HeaderMap
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_eligible_with_gzip() {
        let request = headers([("accept-encoding", "gzip")]);
        assert!(is_eligible(&request, &HeaderMap::new()));
    }

    #[test]
    fn test_eligible_with_gzip_among_others() {
        let request = headers([("accept-encoding", "br, gzip;q=0.8, deflate")]);
        assert!(is_eligible(&request, &HeaderMap::new()));
    }

    #[test]
    fn test_not_eligible_without_accept_encoding() {
        assert!(!is_eligible(&HeaderMap::new(), &HeaderMap::new()));
    }

    #[test]
    fn test_not_eligible_with_other_encodings() {
        let request = headers([("accept-encoding", "br, deflate")]);
        assert!(!is_eligible(&request, &HeaderMap::new()));
    }

    #[test]
    fn test_not_eligible_for_websocket() {
        let request = headers([
            ("accept-encoding", "gzip"),
            ("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ=="),
        ]);
        assert!(!is_eligible(&request, &HeaderMap::new()));
    }

    #[test]
    fn test_empty_websocket_key_is_ignored() {
        let request = headers([("accept-encoding", "gzip"), ("sec-websocket-key", "")]);
        assert!(is_eligible(&request, &HeaderMap::new()));
    }

    #[test]
    fn test_not_eligible_when_already_gzip() {
        let request = headers([("accept-encoding", "gzip")]);
        let response = headers([("content-encoding", "gzip")]);
        assert!(!is_eligible(&request, &response));
    }

    #[test]
    fn test_other_content_encoding_is_not_gzip() {
        // Left to the decision step, which refuses any existing encoding.
        let response = headers([("content-encoding", "br")]);
        assert!(!is_already_encoded(&response));
    }
}
