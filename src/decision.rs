use crate::codec::ENCODING_GZIP;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Request, StatusCode};

/// Whether a response is compressed.
///
/// Starts as `Undecided` and moves exactly once to `Enabled` or `Disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing has been committed or written yet.
    Undecided,
    /// The body is passed through unchanged.
    Disabled,
    /// The body is gzip-encoded.
    Enabled,
}

/// Decides per response whether compression is allowed.
///
/// Called once, when the response head is final, with the response headers
/// and the head of the request. Implemented for any matching closure.
pub trait AllowCompression: Send + Sync {
    /// Returns `false` to send the response uncompressed.
    fn allow_compression(&self, response: &HeaderMap, request: &Request<()>) -> bool;
}

impl<F> AllowCompression for F
where
    F: Fn(&HeaderMap, &Request<()>) -> bool + Send + Sync,
{
    fn allow_compression(&self, response: &HeaderMap, request: &Request<()>) -> bool {
        self(response, request)
    }
}

/// Takes the compression decision for a response whose head is final.
///
/// `allowed` is only consulted when the response is not already encoded. On
/// `Enabled` the compression headers have been applied to `headers`.
pub(crate) fn decide<F>(headers: &mut HeaderMap, allowed: F) -> Decision
where
    F: FnOnce(&HeaderMap) -> bool,
{
    if headers.contains_key(header::CONTENT_ENCODING) {
        tracing::debug!("response already has a content encoding, not compressing");
        return Decision::Disabled;
    }

    if !allowed(headers) {
        tracing::debug!("compression refused by predicate");
        return Decision::Disabled;
    }

    apply_compression_headers(headers);
    tracing::debug!("compressing response with gzip");
    Decision::Enabled
}

/// Statuses that never carry a body, so there is nothing to compress.
pub(crate) fn is_bodyless(status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

/// Builds a body-less copy of the request head for the allow predicate.
pub(crate) fn request_head<B>(request: &Request<B>) -> Request<()> {
    let mut head = Request::new(());
    *head.method_mut() = request.method().clone();
    *head.uri_mut() = request.uri().clone();
    *head.version_mut() = request.version();
    *head.headers_mut() = request.headers().clone();
    head
}

fn apply_compression_headers(headers: &mut HeaderMap) {
    // Compressed length is unknown
    headers.remove(header::CONTENT_LENGTH);

    // Ranges of the compressed stream can't be served
    headers.remove(header::ACCEPT_RANGES);

    headers.insert(
        header::CONTENT_ENCODING,
        HeaderValue::from_static(ENCODING_GZIP),
    );

    add_vary_accept_encoding(headers);
}

/// Adds Accept-Encoding to the Vary header if not already present.
fn add_vary_accept_encoding(headers: &mut HeaderMap) {
    for vary in headers.get_all(header::VARY) {
        if let Ok(vary_str) = vary.to_str() {
            let covered = vary_str.split(',').any(|v| {
                let v = v.trim();
                v.eq_ignore_ascii_case("*") || v.eq_ignore_ascii_case("accept-encoding")
            });
            if covered {
                return;
            }
        }
    }

    headers.append(
        header::VARY,
        HeaderValue::from_static("accept-encoding"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers<I>(pairs: I) -> HeaderMap
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_enabled_rewrites_headers() {
        let mut h = headers([
            ("content-length", "21"),
            ("accept-ranges", "bytes"),
            ("content-type", "text/plain"),
        ]);
        assert_eq!(decide(&mut h, |_| true), Decision::Enabled);

        assert!(h.get(header::CONTENT_LENGTH).is_none());
        assert!(h.get(header::ACCEPT_RANGES).is_none());
        assert_eq!(h.get(header::CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(h.get(header::VARY).unwrap(), "accept-encoding");
        assert_eq!(h.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_disabled_leaves_headers_alone() {
        let mut h = headers([("content-length", "21")]);
        let before = h.clone();
        assert_eq!(decide(&mut h, |_| false), Decision::Disabled);
        assert_eq!(h, before);
    }

    #[test]
    fn test_existing_encoding_skips_predicate() {
        let mut h = headers([("content-encoding", "br")]);
        let decision = decide(&mut h, |_| panic!("predicate must not run"));
        assert_eq!(decision, Decision::Disabled);
        assert_eq!(h.get(header::CONTENT_ENCODING).unwrap(), "br");
    }

    #[test]
    fn test_predicate_sees_final_headers() {
        let mut h = headers([("content-type", "image/png")]);
        let decision = decide(&mut h, |h| {
            h.get(header::CONTENT_TYPE).is_some_and(|v| v != "image/png")
        });
        assert_eq!(decision, Decision::Disabled);
    }

    #[test]
    fn test_vary_header_appended() {
        let mut h = headers([("vary", "origin")]);
        decide(&mut h, |_| true);

        let vary_values: Vec<_> = h
            .get_all(header::VARY)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(vary_values, vec!["origin", "accept-encoding"]);
    }

    #[test]
    fn test_vary_header_not_duplicated() {
        let mut h = headers([("vary", "Origin, Accept-Encoding")]);
        decide(&mut h, |_| true);
        assert_eq!(h.get_all(header::VARY).iter().count(), 1);
    }

    #[test]
    fn test_vary_header_star_not_modified() {
        let mut h = headers([("vary", "*")]);
        decide(&mut h, |_| true);
        assert_eq!(h.get(header::VARY).unwrap(), "*");
        assert_eq!(h.get_all(header::VARY).iter().count(), 1);
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = |_: &HeaderMap, req: &Request<()>| req.uri().path() != "/raw";
        let raw = Request::get("/raw").body(()).unwrap();
        let page = Request::get("/page").body(()).unwrap();
        assert!(!predicate.allow_compression(&HeaderMap::new(), &raw));
        assert!(predicate.allow_compression(&HeaderMap::new(), &page));
    }

    #[test]
    fn test_request_head_copies_metadata() {
        let request = Request::post("/upload?x=1")
            .header("accept-encoding", "gzip")
            .body("payload")
            .unwrap();
        let head = request_head(&request);
        assert_eq!(*head.method(), http::Method::POST);
        assert_eq!(head.uri(), "/upload?x=1");
        assert_eq!(head.headers().get("accept-encoding").unwrap(), "gzip");
    }

    #[test]
    fn test_bodyless_statuses() {
        assert!(is_bodyless(StatusCode::CONTINUE));
        assert!(is_bodyless(StatusCode::SWITCHING_PROTOCOLS));
        assert!(is_bodyless(StatusCode::NO_CONTENT));
        assert!(is_bodyless(StatusCode::NOT_MODIFIED));
        assert!(!is_bodyless(StatusCode::OK));
        assert!(!is_bodyless(StatusCode::NOT_FOUND));
    }
}
