use crate::codec::{DEFAULT_COMPRESSION, Encoder};
use crate::compression_writer::CompressionWriter;
use crate::decision::{AllowCompression, Decision};
use crate::eligibility::is_eligible;
use crate::writer::{ResponseWriter, StatusWriter};
use http::Request;
use std::fmt;
use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Gzip middleware for imperative [`ResponseWriter`] handlers.
///
/// The compression level is only validated when a request is processed; an
/// invalid level makes every response go out uncompressed.
///
/// A compressed response gets `Content-Encoding: gzip` and `accept-encoding`
/// added to `Vary`. `Content-Length` and `Accept-Ranges` are removed, since
/// both describe the uncompressed body. A response committed with a 1xx, 204
/// or 304 status is never compressed.
#[derive(Clone)]
pub struct Handler {
    level: i32,
    allow: Option<Arc<dyn AllowCompression>>,
}

impl Handler {
    /// Creates a handler compressing at `level`.
    ///
    /// Valid levels are [`DEFAULT_COMPRESSION`] and `0..=9`
    /// (see [`NO_COMPRESSION`](crate::NO_COMPRESSION),
    /// [`BEST_SPEED`](crate::BEST_SPEED) and
    /// [`BEST_COMPRESSION`](crate::BEST_COMPRESSION)).
    pub fn new(level: i32) -> Self {
        Self { level, allow: None }
    }

    /// Registers a callback that can veto compression per response.
    ///
    /// The callback runs the first time the response head is committed or the
    /// body is written to. All response headers have been set by then, so the
    /// decision can depend on `Content-Type`, `Content-Range` and so on.
    pub fn allow_compression<P>(mut self, predicate: P) -> Self
    where
        P: AllowCompression + 'static,
    {
        self.allow = Some(Arc::new(predicate));
        self
    }

    /// The configured compression level.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Runs `next`, compressing what it writes when the client accepts gzip.
    ///
    /// Compression never fails the response: when the request is not
    /// eligible or the encoder can't be built, `next` gets `sink` unchanged.
    /// The gzip stream is finished after `next` returns, also when it fails or
    /// panics, and only if compression was enabled.
    pub fn process<B, F>(
        &self,
        sink: &mut dyn ResponseWriter,
        request: &Request<B>,
        next: F,
    ) -> io::Result<()>
    where
        F: FnOnce(&mut dyn ResponseWriter, &Request<B>) -> io::Result<()>,
    {
        if !is_eligible(request.headers(), sink.headers()) {
            return next(sink, request);
        }

        let encoder = match Encoder::new(self.level) {
            Ok(encoder) => encoder,
            Err(err) => {
                tracing::debug!(%err, "gzip disabled for request");
                return next(sink, request);
            }
        };

        let writer = CompressionWriter::new(
            request,
            StatusWriter::new(sink),
            encoder,
            self.allow.as_deref(),
        );
        let mut guard = FinishGuard { writer };

        let result = next(&mut *guard, request);
        let finished = guard.finish();
        result.and(finished)
    }

    pub(crate) fn allow(&self) -> Option<Arc<dyn AllowCompression>> {
        self.allow.clone()
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("level", &self.level)
            .field("allow", &self.allow.is_some())
            .finish()
    }
}

/// Finishes the gzip stream on every exit path of [`Handler::process`].
struct FinishGuard<'a, W: ResponseWriter, B> {
    writer: CompressionWriter<'a, W, B>,
}

impl<W: ResponseWriter, B> FinishGuard<'_, W, B> {
    fn finish(&mut self) -> io::Result<()> {
        self.writer.finish()
    }
}

impl<'a, W: ResponseWriter, B> Deref for FinishGuard<'a, W, B> {
    type Target = CompressionWriter<'a, W, B>;

    fn deref(&self) -> &Self::Target {
        &self.writer
    }
}

impl<W: ResponseWriter, B> DerefMut for FinishGuard<'_, W, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.writer
    }
}

impl<W: ResponseWriter, B> Drop for FinishGuard<'_, W, B> {
    fn drop(&mut self) {
        // No-op when `finish` already ran on the normal path.
        if self.writer.decision() == Decision::Enabled {
            if let Err(err) = self.writer.finish() {
                tracing::warn!(%err, "failed to finish gzip stream");
            }
        }
    }
}
