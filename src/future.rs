use crate::body::CompressionBody;
use crate::codec::Encoder;
use crate::decision::{self, AllowCompression, Decision};
use http::{Request, Response};
use http_body::Body;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Everything needed to compress one response, set up when the request
/// was eligible.
pub(crate) struct Negotiated {
    pub(crate) encoder: Encoder,
    pub(crate) allow: Option<Arc<dyn AllowCompression>>,
    /// Head of the request, kept only when there is a predicate to call.
    pub(crate) request: Option<Request<()>>,
}

pin_project! {
    /// Future for compression service responses.
    pub struct ResponseFuture<F> {
        #[pin]
        inner: F,
        negotiated: Option<Negotiated>,
    }
}

impl<F> ResponseFuture<F> {
    pub(crate) fn new(inner: F, negotiated: Option<Negotiated>) -> Self {
        Self { inner, negotiated }
    }
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: Body,
{
    type Output = Result<Response<CompressionBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.inner.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Ready(Ok(response)) => {
                let response = wrap_response(response, this.negotiated.take());
                Poll::Ready(Ok(response))
            }
        }
    }
}

/// Takes the compression decision for a finished response head.
///
/// Returning the head is the header commit, so this is the single point
/// where the decision happens. A response with nothing to write stays
/// undecided and is passed through untouched.
fn wrap_response<B: Body>(
    response: Response<B>,
    negotiated: Option<Negotiated>,
) -> Response<CompressionBody<B>> {
    let (mut parts, body) = response.into_parts();

    let Some(Negotiated {
        encoder,
        allow,
        request,
    }) = negotiated
    else {
        return Response::from_parts(parts, CompressionBody::passthrough(body));
    };

    if decision::is_bodyless(parts.status) || body.is_end_stream() {
        tracing::trace!(status = %parts.status, "empty response body, not compressing");
        return Response::from_parts(parts, CompressionBody::passthrough(body));
    }

    let decision = decision::decide(&mut parts.headers, |headers| {
        match (allow.as_deref(), request.as_ref()) {
            (Some(allow), Some(request)) => allow.allow_compression(headers, request),
            _ => true,
        }
    });

    let body = match decision {
        Decision::Enabled => CompressionBody::compressed(body, encoder),
        _ => CompressionBody::passthrough(body),
    };

    Response::from_parts(parts, body)
}
