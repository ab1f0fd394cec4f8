//! Transport abstraction: any non-blocking byte channel.
//!
//! The control session is generic over `Transport`, so tests drive it with
//! an in-memory pipe while the server uses TCP sockets.  Neither direction
//! ever waits: a read with nothing pending and a write into a full buffer
//! both return `Ok(0)`.

use std::io::{self, Read, Write};
use std::net::TcpStream;

/// Why a transport stopped working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The peer closed the connection.
    Closed,
    /// The peer stopped reading and its pending replies outgrew the outbox.
    Backlogged,
    /// Any other I/O failure.
    Io(io::ErrorKind),
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Closed => write!(f, "connection closed"),
            Self::Backlogged => write!(f, "peer is not reading replies"),
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Non-blocking byte channel.
pub trait Transport {
    /// Read up to `buf.len()` bytes.  `Ok(0)` means nothing is available
    /// right now; a closed peer is [`TransportError::Closed`].
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write a prefix of `data`.  Returns how many bytes were taken; `Ok(0)`
    /// means the channel cannot take more right now.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;
}

impl Transport for TcpStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match Read::read(self, buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(TransportError::Io(e.kind())),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if data.is_empty() {
            return Ok(0);
        }
        match Write::write(self, data) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(TransportError::Io(e.kind())),
        }
    }
}
