//! TCP control endpoint.
//!
//! A non-blocking listener with a fixed table of client sessions.  The
//! runtime calls [`ControlServer::poll`] every control tick; each poll
//! accepts pending connections and services every session once.
//!
//! Each session has its own token bucket (10 requests/s, burst 10).  A
//! request over budget is answered with `err rate limited` and not
//! executed.
//!
//! A poll never waits on a client: each session reads a bounded amount of
//! input per poll, and replies the socket cannot take yet wait in a small
//! outbox.  A client that stops reading until the outbox overflows is
//! disconnected.

use core::time::Duration;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};

use burster::Limiter;
use heapless::Vec;
use log::{debug, info, warn};

use crate::app::events::{ChangeSource, SupervisorEvent};
use crate::app::ports::EventSink;
use crate::app::service::ControlService;
use crate::error::{Error, ProtocolError};

use super::codec::LineDecoder;
use super::protocol::{self, ReplyLine};
use super::transport::{Transport, TransportError};

/// Maximum number of concurrent control clients.
pub const MAX_CLIENTS: usize = 3;

const READ_BUF_SIZE: usize = 256;

/// Input consumed from one client per poll.  Every line is at least one
/// byte, so this also bounds the requests answered per poll.
pub const MAX_BYTES_PER_POLL: usize = 512;

/// Replies held for a client whose socket is full.  A client that lets
/// this overflow is dropped.
pub const OUTBOX_SIZE: usize = 1024;

const BUSY_REPLY: &[u8] = b"err server busy\n";

/// Execute one request line and render the reply.
pub fn handle_line(line: &str, control: &ControlService, sink: &mut impl EventSink) -> ReplyLine {
    let cmd = match protocol::parse_command(line) {
        Ok(cmd) => cmd,
        Err(error) => {
            debug!("Control: bad request {:?}: {}", line, error);
            sink.emit(&SupervisorEvent::CommandRejected {
                source: ChangeSource::Remote,
                error,
            });
            return protocol::format_error(&error);
        }
    };
    match control.handle(cmd, ChangeSource::Remote, sink) {
        Ok(reply) => protocol::format_reply(&reply),
        Err(error) => protocol::format_error(&error),
    }
}

// ── Session ──────────────────────────────────────────────────

/// One connected client: transport, line decoder, rate limiter and the
/// replies its socket has not taken yet.
pub struct ClientSession<T: Transport> {
    transport: T,
    decoder: LineDecoder,
    rate_limiter: burster::TokenBucket<fn() -> Duration>,
    outbox: Vec<u8, OUTBOX_SIZE>,
    requests: u64,
}

impl<T: Transport> ClientSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            decoder: LineDecoder::new(),
            rate_limiter: burster::TokenBucket::new_with_time_provider(
                10,
                10, // 10 requests per second, 10 burst capacity
                platform_now as fn() -> Duration,
            ),
            outbox: Vec::new(),
            requests: 0,
        }
    }

    /// Read at most [`MAX_BYTES_PER_POLL`] bytes, answer every line they
    /// complete and push out as much of the outbox as the transport takes.
    ///
    /// Never waits on the peer.  Returns an error when the session should
    /// be closed, including when the peer stops reading replies.
    pub fn service(
        &mut self,
        control: &ControlService,
        sink: &mut impl EventSink,
    ) -> Result<(), TransportError> {
        self.flush()?;

        let mut buf = [0u8; READ_BUF_SIZE];
        let mut budget = MAX_BYTES_PER_POLL;
        while budget > 0 {
            let want = budget.min(READ_BUF_SIZE);
            let n = self.transport.read(&mut buf[..want])?;
            if n == 0 {
                break;
            }
            budget -= n;
            for &byte in &buf[..n] {
                let Some(line) = self.decoder.push(byte) else {
                    continue;
                };
                let reply = self.answer(line, control, sink);
                self.queue(reply.as_bytes())?;
            }
        }

        self.flush()
    }

    fn answer(
        &mut self,
        line: Result<super::codec::Line, ProtocolError>,
        control: &ControlService,
        sink: &mut impl EventSink,
    ) -> ReplyLine {
        self.requests += 1;
        if self.rate_limiter.try_consume(1).is_err() {
            warn!("Control: client over rate limit, request dropped");
            return protocol::format_error(&ProtocolError::RateLimited.into());
        }
        match line {
            Ok(line) => handle_line(&line, control, sink),
            Err(e) => {
                let error = Error::Protocol(e);
                sink.emit(&SupervisorEvent::CommandRejected {
                    source: ChangeSource::Remote,
                    error,
                });
                protocol::format_error(&error)
            }
        }
    }

    /// Append a reply, making room by flushing first if needed.
    fn queue(&mut self, reply: &[u8]) -> Result<(), TransportError> {
        if self.outbox.extend_from_slice(reply).is_ok() {
            return Ok(());
        }
        self.flush()?;
        self.outbox
            .extend_from_slice(reply)
            .map_err(|()| TransportError::Backlogged)
    }

    /// Hand the outbox to the transport until it stops taking bytes.
    fn flush(&mut self) -> Result<(), TransportError> {
        let mut sent = 0;
        while sent < self.outbox.len() {
            let n = self.transport.write(&self.outbox[sent..])?;
            if n == 0 {
                break;
            }
            sent += n;
        }
        if sent > 0 {
            let len = self.outbox.len();
            self.outbox.copy_within(sent.., 0);
            self.outbox.truncate(len - sent);
        }
        Ok(())
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Reply bytes accepted but not yet taken by the transport.
    pub fn pending_output(&self) -> usize {
        self.outbox.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

// ── Server ───────────────────────────────────────────────────

struct Slot {
    peer: SocketAddr,
    session: ClientSession<TcpStream>,
}

/// Non-blocking TCP control server.
pub struct ControlServer {
    listener: TcpListener,
    slots: [Option<Slot>; MAX_CLIENTS],
}

impl ControlServer {
    pub fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!("Control: listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            slots: Default::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn connected(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Accept pending clients, then service every session.
    pub fn poll(&mut self, control: &ControlService, sink: &mut impl EventSink) {
        self.accept_pending();

        for (id, slot) in self.slots.iter_mut().enumerate() {
            let Some(active) = slot else { continue };
            if let Err(e) = active.session.service(control, sink) {
                match e {
                    TransportError::Closed => info!("Control: client {} ({}) disconnected", id, active.peer),
                    e => warn!("Control: client {} ({}) dropped: {}", id, active.peer, e),
                }
                *slot = None;
            }
        }
    }

    fn accept_pending(&mut self) {
        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(conn) => conn,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    warn!("Control: accept failed: {}", e);
                    return;
                }
            };

            let Some(free) = self.slots.iter_mut().find(|s| s.is_none()) else {
                warn!("Control: {} refused, {} clients connected", peer, MAX_CLIENTS);
                refuse_busy(stream, peer);
                continue;
            };

            if let Err(e) = stream.set_nonblocking(true) {
                warn!("Control: {} refused: {}", peer, e);
                continue;
            }
            info!("Control: client {} connected", peer);
            *free = Some(Slot {
                peer,
                session: ClientSession::new(stream),
            });
        }
    }
}

/// Tell a client over the limit why it is being closed.  Best effort: the
/// socket is dropped right after.
fn refuse_busy(mut stream: TcpStream, peer: SocketAddr) {
    if let Err(e) = stream.set_nonblocking(true) {
        debug!("Control: {} busy reply skipped: {}", peer, e);
        return;
    }
    match Transport::write(&mut stream, BUSY_REPLY) {
        Ok(n) if n == BUSY_REPLY.len() => {}
        Ok(n) => debug!("Control: busy reply to {} cut short ({} bytes)", peer, n),
        Err(e) => debug!("Control: busy reply to {} failed: {}", peer, e),
    }
}

// ── Platform time for rate limiter ───────────────────────────

fn platform_now() -> Duration {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
