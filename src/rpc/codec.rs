//! Newline-delimited line codec.
//!
//! Wire format: one ASCII request per line, `\n` terminated, optional
//! `\r` before the newline.
//!
//! The decoder accumulates bytes into a fixed buffer and yields complete
//! lines.  A single `Transport::read` may carry part of a line or several
//! lines.  A line that outgrows the buffer is discarded up to its newline
//! and reported once as [`ProtocolError::LineTooLong`].

use heapless::{String, Vec};

use crate::error::ProtocolError;

/// Longest accepted request line, excluding the terminator.
pub const MAX_LINE: usize = 64;

/// One decoded request line.
pub type Line = String<MAX_LINE>;

/// Streaming line decoder.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8, MAX_LINE>,
    overflowed: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte.  Returns a result when the byte completes a line.
    pub fn push(&mut self, byte: u8) -> Option<Result<Line, ProtocolError>> {
        if byte != b'\n' {
            if !self.overflowed && self.buf.push(byte).is_err() {
                self.overflowed = true;
            }
            return None;
        }

        if self.overflowed {
            self.reset();
            return Some(Err(ProtocolError::LineTooLong));
        }

        let mut bytes = core::mem::take(&mut self.buf);
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        Some(String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidValue))
    }

    /// Drop any partial line.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }

    /// Bytes buffered for the current, incomplete line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
