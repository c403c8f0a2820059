use crate::codec::Encoder;
use crate::decision::request_head;
use crate::eligibility::request_is_eligible;
use crate::future::{Negotiated, ResponseFuture};
use crate::handler::Handler;
use http::Request;
use http_body::Body;
use std::task::{Context, Poll};
use tower::Service;

/// A Tower service that gzip-compresses HTTP response bodies.
#[derive(Debug, Clone)]
pub struct CompressionService<S> {
    inner: S,
    handler: Handler,
}

impl<S> CompressionService<S> {
    /// Creates a new compression service wrapping the given inner service.
    pub fn new(inner: S, handler: Handler) -> Self {
        Self { inner, handler }
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn negotiate<B>(&self, req: &Request<B>) -> Option<Negotiated> {
        if !request_is_eligible(req.headers()) {
            return None;
        }

        let encoder = match Encoder::new(self.handler.level()) {
            Ok(encoder) => encoder,
            Err(err) => {
                tracing::debug!(%err, "gzip disabled for request");
                return None;
            }
        };

        let allow = self.handler.allow();
        let request = allow.as_ref().map(|_| request_head(req));
        Some(Negotiated {
            encoder,
            allow,
            request,
        })
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CompressionService<S>
where
    S: Service<Request<ReqBody>, Response = http::Response<ResBody>>,
    ResBody: Body,
{
    type Response = http::Response<crate::body::CompressionBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let negotiated = self.negotiate(&req);
        let inner = self.inner.call(req);

        ResponseFuture::new(inner, negotiated)
    }
}
