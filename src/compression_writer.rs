use crate::codec::Encoder;
use crate::decision::{self, AllowCompression, Decision};
use crate::sniff::detect_content_type;
use crate::writer::ResponseWriter;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Request, StatusCode};
use std::io::{self, Write};

/// A [`ResponseWriter`] that gzip-encodes the body once compression is decided.
///
/// The decision is deferred until the downstream code either commits the
/// status with [`write_header`](ResponseWriter::write_header) or writes the
/// first body byte. At that point the headers are final, so the allow
/// predicate and the content sniffing see the complete header set.
///
/// The writer never finishes the gzip stream itself; whoever created it calls
/// [`finish`](Self::finish) once downstream is done.
pub struct CompressionWriter<'a, W, B> {
    request: &'a Request<B>,
    inner: W,
    encoder: Option<Encoder>,
    decision: Decision,
    allow: Option<&'a dyn AllowCompression>,
}

impl<'a, W, B> CompressionWriter<'a, W, B>
where
    W: ResponseWriter,
{
    pub(crate) fn new(
        request: &'a Request<B>,
        inner: W,
        encoder: Encoder,
        allow: Option<&'a dyn AllowCompression>,
    ) -> Self {
        Self {
            request,
            inner,
            encoder: Some(encoder),
            decision: Decision::Undecided,
            allow,
        }
    }

    /// The current compression decision.
    pub fn decision(&self) -> Decision {
        self.decision
    }

    /// Transitions out of `Undecided` for a response committed with `status`.
    /// Later calls do nothing.
    fn decide(&mut self, status: StatusCode) {
        if self.decision != Decision::Undecided {
            return;
        }

        if decision::is_bodyless(status) {
            tracing::trace!(%status, "status carries no body, not compressing");
            self.decision = Decision::Disabled;
            return;
        }

        let allow = self.allow;
        let request = self.request;
        self.decision = decision::decide(self.inner.headers_mut(), |headers| match allow {
            Some(allow) => allow.allow_compression(headers, &decision::request_head(request)),
            None => true,
        });
    }

    /// Finishes the gzip stream if compression was enabled.
    ///
    /// Writes the remaining encoded data and the gzip trailer to the inner
    /// writer. Only the first call after an `Enabled` decision does any work;
    /// with any other decision nothing was encoded and nothing is written.
    pub(crate) fn finish(&mut self) -> io::Result<()> {
        if self.decision != Decision::Enabled {
            return Ok(());
        }
        let Some(mut encoder) = self.encoder.take() else {
            return Ok(());
        };

        let trailer = encoder.finish()?;
        self.inner.write_all(&trailer)
    }
}

impl<W, B> ResponseWriter for CompressionWriter<'_, W, B>
where
    W: ResponseWriter,
{
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.decide(status);
        self.inner.write_header(status);
    }
}

impl<W, B> Write for CompressionWriter<'_, W, B>
where
    W: ResponseWriter,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.decision == Decision::Undecided {
            // Sniff before the encoding is decided, or the type would describe
            // the gzip stream.
            if !self.inner.headers().contains_key(header::CONTENT_TYPE) {
                self.inner.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(detect_content_type(buf)),
                );
            }
            self.write_header(StatusCode::OK);
        }

        match self.decision {
            Decision::Enabled => {
                let encoder = self.encoder.as_mut().ok_or_else(|| {
                    io::Error::other("write after the gzip stream was finished")
                })?;
                let encoded = encoder.encode(buf)?;
                if !encoded.is_empty() {
                    self.inner.write_all(&encoded)?;
                }
                Ok(buf.len())
            }
            _ => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.decision == Decision::Enabled {
            if let Some(encoder) = self.encoder.as_mut() {
                let pending = encoder.flush()?;
                if !pending.is_empty() {
                    self.inner.write_all(&pending)?;
                }
            }
        }
        self.inner.flush()
    }
}
