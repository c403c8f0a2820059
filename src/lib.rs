//! Gzip response compression middleware with a deferred decision.
//!
//! Whether a response is compressed is decided as late as possible: when the
//! response head is committed or the first body byte is written. At that
//! point every header is final, so an optional callback can look at
//! `Content-Type`, `Content-Range` or anything else before compression is
//! switched on. The decision is taken once and never revisited.
//!
//! Two front ends share that logic:
//!
//! - [`Handler`] drives imperative [`ResponseWriter`] handlers.
//! - [`CompressionLayer`] wraps a Tower service returning `http::Response`s.
//!
//! # Example
//!
//! ```ignore
//! use http_gzip_handler::{CompressionLayer, BEST_SPEED};
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(CompressionLayer::new(BEST_SPEED))
//!     .service(my_service);
//! ```
//!
//! # Compression Rules
//!
//! The middleware will **not** compress responses when:
//! - The request's `Accept-Encoding` does not contain `gzip`
//! - The request carries a `Sec-WebSocket-Key` header
//! - `Content-Encoding` header is already set
//! - The allow callback returns `false`
//! - The compression level is invalid
//!
//! # Response Modifications
//!
//! When compression is applied:
//! - `Content-Encoding` header is set to `gzip`
//! - `Content-Length` header is removed (compressed size is unknown)
//! - `Accept-Ranges` header is removed
//! - `Vary` header includes `Accept-Encoding`
//!
//! A response written without a `Content-Type` gets one sniffed from its
//! first chunk before any of the above happens.

#![deny(missing_docs)]

mod body;
mod codec;
mod compression_writer;
mod decision;
mod eligibility;
mod error;
mod future;
mod handler;
mod layer;
mod service;
mod sniff;
mod writer;

pub use body::CompressionBody;
pub use codec::{BEST_COMPRESSION, BEST_SPEED, DEFAULT_COMPRESSION, ENCODING_GZIP, NO_COMPRESSION};
pub use compression_writer::CompressionWriter;
pub use decision::{AllowCompression, Decision};
pub use eligibility::{is_already_encoded, is_eligible, request_is_eligible};
pub use error::Error;
pub use future::ResponseFuture;
pub use handler::Handler;
pub use layer::CompressionLayer;
pub use service::CompressionService;
pub use sniff::{SNIFF_LEN, detect_content_type};
pub use writer::{ResponseRecorder, ResponseWriter, StatusWriter};
