//! Imperative response writers.
//!
//! A [`ResponseWriter`] is a byte sink plus a mutable header map and a one-shot
//! status commit. Middleware decorates writers by wrapping one inside another
//! and forwarding every call it does not need to intercept.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use std::io;

/// A response under construction.
///
/// Headers may be changed until [`write_header`](Self::write_header) is called
/// or the first body byte is written, whichever happens first.
pub trait ResponseWriter: io::Write {
    /// Returns the response headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the response headers for modification.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the status line and the current headers.
    fn write_header(&mut self, status: StatusCode);
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers(&self) -> &HeaderMap {
        (**self).headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        (**self).write_header(status)
    }
}

/// Captures the committed status of the writer it wraps.
///
/// Only the first `write_header` reaches the inner writer; later ones are
/// dropped. Writing a body before any status commits `200 OK`.
#[derive(Debug)]
pub struct StatusWriter<W> {
    inner: W,
    status: Option<StatusCode>,
}

impl<W: ResponseWriter> StatusWriter<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            status: None,
        }
    }

    /// The committed status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether the status line has been committed.
    pub fn written(&self) -> bool {
        self.status.is_some()
    }

    /// Consumes this writer, returning the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: ResponseWriter> ResponseWriter for StatusWriter<W> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        if let Some(committed) = self.status {
            tracing::debug!(%committed, ignored = %status, "superfluous write_header call");
            return;
        }
        self.status = Some(status);
        self.inner.write_header(status);
    }
}

impl<W: ResponseWriter> io::Write for StatusWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// An in-memory [`ResponseWriter`] that records what was written.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: BytesMut,
}

impl ResponseRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, `200 OK` if none was committed.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Whether a status was committed.
    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    /// The body bytes written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes the recorder, returning the headers and the body.
    pub fn into_parts(self) -> (HeaderMap, Bytes) {
        (self.headers, self.body.freeze())
    }
}

impl ResponseWriter for ResponseRecorder {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }
}

impl io::Write for ResponseRecorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
