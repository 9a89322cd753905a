//! NDJSON line framing for the agent's stdout.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length so a
//! misbehaving agent cannot make the client buffer an unterminated line
//! without bound. Oversized lines are discarded, never fatal.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use acp_invoke::acp::codec::AcpCodec;
//!
//! let lines = FramedRead::new(child_stdout, AcpCodec::new());
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};
use tracing::warn;

/// Maximum line length accepted by the codec: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Inbound NDJSON decoder.
///
/// Each newline-terminated (`\n`) UTF-8 string is one candidate message.
/// A trailing `\r` is stripped by the inner [`LinesCodec`].
///
/// A line longer than [`MAX_LINE_BYTES`] is dropped inside the decoder:
/// decoding resumes at the next newline within the same call, so lines
/// already buffered behind it are still yielded. Only I/O failures surface
/// as errors.
#[derive(Debug)]
pub struct AcpCodec {
    lines: LinesCodec,
    dropped: usize,
}

impl AcpCodec {
    /// Create a new `AcpCodec` with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_BYTES),
            dropped: 0,
        }
    }

    /// Number of oversized lines dropped so far.
    #[must_use]
    pub fn dropped_lines(&self) -> usize {
        self.dropped
    }

    fn skip_oversized(
        &mut self,
        result: Result<Option<String>, LinesCodecError>,
    ) -> Option<std::io::Result<Option<String>>> {
        match result {
            Ok(line) => Some(Ok(line)),
            Err(LinesCodecError::Io(err)) => Some(Err(err)),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                self.dropped += 1;
                warn!(limit = MAX_LINE_BYTES, "dropping oversized line from agent");
                None
            }
        }
    }
}

impl Default for AcpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AcpCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> std::io::Result<Option<Self::Item>> {
        loop {
            let result = self.lines.decode(src);
            if let Some(outcome) = self.skip_oversized(result) {
                return outcome;
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> std::io::Result<Option<Self::Item>> {
        loop {
            let result = self.lines.decode_eof(src);
            if let Some(outcome) = self.skip_oversized(result) {
                return outcome;
            }
        }
    }
}
