use crate::decision::AllowCompression;
use crate::handler::Handler;
use crate::service::CompressionService;
use tower::Layer;

/// A Tower layer that gzip-compresses HTTP response bodies.
///
/// Requests whose `Accept-Encoding` does not mention gzip, and WebSocket
/// handshakes, pass through untouched. For the rest the decision is taken
/// when the inner service returns its response head.
///
/// Unlike [`Handler::process`], the layer never sniffs a `Content-Type`: the
/// head is final before any body frame exists. Services should set their own
/// type, otherwise a compressed response goes out without one. Responses
/// with a 1xx, 204 or 304 status, or an empty body, are left untouched.
#[derive(Debug, Clone, Default)]
pub struct CompressionLayer {
    handler: Handler,
}

impl CompressionLayer {
    /// Creates a layer compressing at `level`.
    ///
    /// An invalid level is not an error here; responses are then sent
    /// uncompressed.
    pub fn new(level: i32) -> Self {
        Self {
            handler: Handler::new(level),
        }
    }

    /// Registers a callback that can veto compression per response.
    pub fn allow_compression<P>(mut self, predicate: P) -> Self
    where
        P: AllowCompression + 'static,
    {
        self.handler = self.handler.allow_compression(predicate);
        self
    }
}

impl From<Handler> for CompressionLayer {
    fn from(handler: Handler) -> Self {
        Self { handler }
    }
}

impl<S> Layer<S> for CompressionLayer {
    type Service = CompressionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CompressionService::new(inner, self.handler.clone())
    }
}
