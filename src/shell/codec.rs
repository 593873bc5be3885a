//! Line codec for interactive shell output.
//!
//! Unlike [`tokio_util::codec::LinesCodec`], this codec never fails on
//! device output: invalid UTF-8 is replaced lossily, and a line longer than
//! [`MAX_LINE_BYTES`] is emitted in pieces instead of aborting the stream.
//! A trailing `\r` is stripped so CRLF shells render like LF shells.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::{AppError, Result};

/// Longest chunk emitted as a single line: 64 KiB.
pub const MAX_LINE_BYTES: usize = 65_536;

/// Newline-delimited decoder for a child process stream.
#[derive(Debug)]
pub struct ShellLineCodec {
    max_length: usize,
    /// Bytes of the buffer already scanned for a newline.
    next_index: usize,
}

impl ShellLineCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec that splits lines longer than `max_length` bytes.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
            next_index: 0,
        }
    }
}

impl Default for ShellLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ShellLineCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next line from `src`.
    ///
    /// Returns `Ok(None)` while no newline has arrived and the buffered data
    /// is still shorter than the length limit.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let newline = src[self.next_index..]
            .iter()
            .position(|byte| *byte == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(index) if index <= self.max_length => {
                self.next_index = 0;
                let line = src.split_to(index);
                src.advance(1);
                Ok(Some(to_line(&line)))
            }
            _ if src.len() >= self.max_length => {
                self.next_index = 0;
                let chunk = src.split_to(self.max_length);
                Ok(Some(to_line(&chunk)))
            }
            _ => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    /// Flush an unterminated final line when the stream ends.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        self.next_index = 0;
        let rest = src.split();
        Ok(Some(to_line(&rest)))
    }
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
