use crate::error::Error;
use bytes::{Bytes, BytesMut};
use compression_codecs::{EncodeV2, gzip::GzipEncoder};
use compression_core::Level;
use compression_core::util::{PartialBuffer, WriteBuffer};
use std::io;

/// The `Content-Encoding` token produced by this crate.
pub const ENCODING_GZIP: &str = "gzip";

/// Stores the input without compressing it.
pub const NO_COMPRESSION: i32 = 0;
/// Fastest compression.
pub const BEST_SPEED: i32 = 1;
/// Smallest output.
pub const BEST_COMPRESSION: i32 = 9;
/// The codec's default trade-off between speed and size.
pub const DEFAULT_COMPRESSION: i32 = -1;

const OUTPUT_BUFFER_SIZE: usize = 8 * 1024; // 8KB output buffer

/// A gzip stream encoder working on byte slices.
///
/// Every call returns the bytes the codec produced for that call, which may be
/// empty while the codec is still buffering.
pub(crate) struct Encoder {
    inner: Box<dyn EncodeV2 + Send>,
    output_buffer: Vec<u8>,
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder").finish_non_exhaustive()
    }
}

impl Encoder {
    /// Creates a gzip encoder at `level`.
    ///
    /// Valid levels are [`DEFAULT_COMPRESSION`] and
    /// [`NO_COMPRESSION`]..=[`BEST_COMPRESSION`].
    pub(crate) fn new(level: i32) -> Result<Self, Error> {
        let level = match level {
            DEFAULT_COMPRESSION => Level::Default,
            NO_COMPRESSION..=BEST_COMPRESSION => Level::Precise(level),
            _ => return Err(Error::InvalidLevel(level)),
        };

        Ok(Self {
            inner: Box::new(GzipEncoder::new(level.into())),
            output_buffer: vec![0u8; OUTPUT_BUFFER_SIZE],
        })
    }

    /// Feeds `input` to the codec and returns whatever output it produced.
    pub(crate) fn encode(&mut self, input: &[u8]) -> io::Result<Bytes> {
        let mut input_buf = PartialBuffer::new(input);
        let mut all_output = BytesMut::new();

        // Keep encoding until all input is consumed
        loop {
            let consumed_before = input_buf.written_len();
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());

            self.inner.encode(&mut input_buf, &mut output)?;

            let written = output.written_len();
            if written > 0 {
                all_output.extend_from_slice(&self.output_buffer[..written]);
            }

            if input_buf.written_len() >= input.len() {
                break;
            }

            if written == 0 && input_buf.written_len() == consumed_before {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "gzip encoder made no progress",
                ));
            }
        }

        Ok(all_output.freeze())
    }

    /// Sync-flushes the codec so everything fed so far can be decoded.
    pub(crate) fn flush(&mut self) -> io::Result<Bytes> {
        let mut all_output = BytesMut::new();
        loop {
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
            let done = self.inner.flush(&mut output)?;
            let written = output.written_len();
            all_output.extend_from_slice(&self.output_buffer[..written]);
            if done {
                return Ok(all_output.freeze());
            }
        }
    }

    /// Finishes the stream, returning the remaining data and the gzip trailer.
    pub(crate) fn finish(&mut self) -> io::Result<Bytes> {
        let mut all_output = BytesMut::new();
        loop {
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
            let done = self.inner.finish(&mut output)?;
            let written = output.written_len();
            all_output.extend_from_slice(&self.output_buffer[..written]);
            if done {
                return Ok(all_output.freeze());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_valid_levels() {
        for level in [DEFAULT_COMPRESSION, NO_COMPRESSION, BEST_SPEED, 5, BEST_COMPRESSION] {
            assert!(Encoder::new(level).is_ok(), "level {level} should be valid");
        }
    }

    #[test]
    fn test_invalid_levels() {
        assert!(matches!(Encoder::new(11), Err(Error::InvalidLevel(11))));
        assert!(matches!(Encoder::new(10), Err(Error::InvalidLevel(10))));
        assert!(matches!(Encoder::new(-2), Err(Error::InvalidLevel(-2))));
    }

    #[test]
    fn test_encode_then_finish_is_valid_gzip() {
        let mut encoder = Encoder::new(DEFAULT_COMPRESSION).unwrap();
        let mut out = Vec::new();
        out.extend_from_slice(&encoder.encode(b"hello ").unwrap());
        out.extend_from_slice(&encoder.encode(b"world").unwrap());
        out.extend_from_slice(&encoder.finish().unwrap());

        assert_eq!(&out[..2], &[0x1f, 0x8b]);
        assert_eq!(gunzip(&out), b"hello world");
    }

    #[test]
    fn test_finish_without_input() {
        let mut encoder = Encoder::new(BEST_SPEED).unwrap();
        let out = encoder.finish().unwrap();
        assert!(gunzip(&out).is_empty());
    }

    #[test]
    fn test_large_input_spans_output_buffers() {
        let input: Vec<u8> = (0..64 * 1024u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut encoder = Encoder::new(NO_COMPRESSION).unwrap();
        let mut out = encoder.encode(&input).unwrap().to_vec();
        out.extend_from_slice(&encoder.finish().unwrap());
        assert_eq!(gunzip(&out), input);
    }

    #[test]
    fn test_flush_emits_pending_output() {
        let mut encoder = Encoder::new(DEFAULT_COMPRESSION).unwrap();
        let mut out = encoder.encode(b"partial").unwrap().to_vec();
        out.extend_from_slice(&encoder.flush().unwrap());
        assert!(!out.is_empty());

        out.extend_from_slice(&encoder.finish().unwrap());
        assert_eq!(gunzip(&out), b"partial");
    }
}
