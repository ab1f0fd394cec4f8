//! Blocking control client used by `supervisor ctl`.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::codec::MAX_LINE;

/// Build a request line from a verb and an optional value,
/// e.g. `("frequency", Some("5"))` → `frequency:5`.
pub fn request_line(command: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{command}:{value}"),
        None => command.to_owned(),
    }
}

/// Send one request and wait for its reply line (terminator stripped).
pub fn send(addr: &str, request: &str, timeout: Duration) -> io::Result<String> {
    if request.len() > MAX_LINE || request.contains('\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "request must be a single line of at most 64 bytes",
        ));
    }

    let target = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address did not resolve"))?;
    let mut stream = TcpStream::connect_timeout(&target, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    stream.write_all(request.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let mut reply = String::new();
    BufReader::new(stream).read_line(&mut reply)?;
    if reply.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed without a reply",
        ));
    }
    Ok(reply.trim_end().to_owned())
}
