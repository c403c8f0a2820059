use thiserror::Error;

/// Errors produced while setting up compression for a response.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured level is outside the range the gzip codec supports.
    #[error("invalid gzip compression level {0}, expected -1..=9")]
    InvalidLevel(i32),
}
