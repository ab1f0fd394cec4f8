//! TCP control endpoint tests against a real loopback socket.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use supervisor::app::events::{ChangeSource, SupervisorEvent};
use supervisor::app::service::ControlService;
use supervisor::error::{Error, ProtocolError};
use supervisor::health::HealthMonitor;
use supervisor::rpc::{ControlServer, MAX_CLIENTS, client};
use supervisor::store::{AttributeStore, Mode};

use crate::mock_hw::RecordingSink;

const TIMEOUT: Duration = Duration::from_secs(2);

/// Server polled on a background thread until dropped.
struct Harness {
    addr: String,
    store: Arc<AttributeStore>,
    sink: RecordingSink,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Harness {
    fn start() -> Self {
        let store = Arc::new(AttributeStore::new());
        let control = ControlService::new(store.clone(), Arc::new(HealthMonitor::default()));
        let mut server = ControlServer::bind("127.0.0.1:0").unwrap();
        let addr: SocketAddr = server.local_addr().unwrap();
        let sink = RecordingSink::new();
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let mut sink = sink.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    server.poll(&control, &mut sink);
                    std::thread::sleep(Duration::from_millis(2));
                }
            })
        };

        Self {
            addr: addr.to_string(),
            store,
            sink,
            stop,
            thread: Some(thread),
        }
    }

    fn send(&self, request: &str) -> String {
        client::send(&self.addr, request, TIMEOUT).unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// A persistent connection that sends several lines over one socket.
struct Conn {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Conn {
    fn open(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(TIMEOUT)).unwrap();
        Self {
            writer: stream.try_clone().unwrap(),
            reader: BufReader::new(stream),
        }
    }

    fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).unwrap();
    }

    fn read_reply(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line.trim_end().to_owned()
    }

    fn request(&mut self, line: &str) -> String {
        self.send_raw(format!("{line}\n").as_bytes());
        self.read_reply()
    }
}

#[test]
fn status_and_reads() {
    let h = Harness::start();
    assert_eq!(h.send("get:frequency"), "ok frequency=2");
    assert_eq!(h.send("get:mode"), "ok mode=auto");
    assert_eq!(h.send("get:temperature"), "ok temperature=0");
    assert_eq!(
        h.send("get:status"),
        "ok frequency=2 mode=auto temperature=0 health=0"
    );
}

#[test]
fn manual_session_over_one_connection() {
    let h = Harness::start();
    let mut conn = Conn::open(&h.addr);
    assert_eq!(conn.request("increase"), "err ignored in auto mode");
    assert_eq!(conn.request("toggle"), "ok mode=manual");
    assert_eq!(conn.request("increase"), "ok frequency=3");
    assert_eq!(conn.request("frequency:19"), "ok frequency=19");
    assert_eq!(conn.request("increase"), "ok frequency=20");
    assert_eq!(conn.request("increase"), "ok frequency=20");
    assert_eq!(conn.request("reset"), "ok frequency=2");
    assert_eq!(conn.request("mode:1"), "ok mode=auto");
    assert_eq!(h.store.mode(), Mode::Auto);
}

#[test]
fn invalid_requests_are_rejected_without_side_effects() {
    let h = Harness::start();
    let mut conn = Conn::open(&h.addr);
    assert_eq!(conn.request("frequency:0"), "err frequency out of range");
    assert_eq!(conn.request("frequency:21"), "err frequency out of range");
    assert_eq!(conn.request("temperature:99"), "err temperature is read-only");
    assert_eq!(conn.request("get:voltage"), "err unknown attribute");
    assert_eq!(conn.request("mode:turbo"), "err mode out of range");
    assert_eq!(conn.request("blink"), "err unknown command");
    assert_eq!(h.store.frequency(), 2);
    assert_eq!(h.store.mode(), Mode::Auto);

    let rejected = h.sink.count(|e| {
        matches!(
            e,
            SupervisorEvent::CommandRejected {
                source: ChangeSource::Remote,
                ..
            }
        )
    });
    assert_eq!(rejected, 6);
}

#[test]
fn overlong_line_is_rejected() {
    let h = Harness::start();
    let mut conn = Conn::open(&h.addr);
    let mut long = "x".repeat(100);
    long.push('\n');
    conn.send_raw(long.as_bytes());
    assert_eq!(conn.read_reply(), "err line too long");
    // The connection survives.
    assert_eq!(conn.request("get:frequency"), "ok frequency=2");
    assert!(h.sink.count(|e| matches!(
        e,
        SupervisorEvent::CommandRejected {
            error: Error::Protocol(ProtocolError::LineTooLong),
            ..
        }
    )) >= 1);
}

#[test]
fn burst_beyond_budget_is_rate_limited() {
    let h = Harness::start();
    let mut conn = Conn::open(&h.addr);
    conn.send_raw("get:mode\n".repeat(15).as_bytes());
    let replies: Vec<String> = (0..15).map(|_| conn.read_reply()).collect();
    assert!(replies.iter().any(|r| r == "err rate limited"));
    assert!(replies.iter().filter(|r| *r == "ok mode=auto").count() >= 10);
}

#[test]
fn fourth_client_is_turned_away() {
    let h = Harness::start();
    let mut held: Vec<Conn> = (0..MAX_CLIENTS).map(|_| Conn::open(&h.addr)).collect();
    for conn in &mut held {
        assert_eq!(conn.request("get:mode"), "ok mode=auto");
    }
    // The refusal arrives without a request being sent.
    let mut extra = Conn::open(&h.addr);
    assert_eq!(extra.read_reply(), "err server busy");
    drop(extra);

    // A slot frees up once a client leaves.
    held.pop();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(h.send("get:mode"), "ok mode=auto");
}

#[test]
fn flooding_client_cannot_stall_the_poll_loop() {
    let control = ControlService::new(
        Arc::new(AttributeStore::new()),
        Arc::new(HealthMonitor::default()),
    );
    let mut server = ControlServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    // Writes requests as fast as it can and never reads a reply.
    let flooder = {
        let stop = stop.clone();
        std::thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.set_write_timeout(Some(Duration::from_millis(100))).unwrap();
            let burst = "status\n".repeat(256);
            while !stop.load(Ordering::SeqCst) {
                match stream.write_all(burst.as_bytes()) {
                    Ok(()) => {}
                    Err(e)
                        if matches!(
                            e.kind(),
                            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                        ) => {}
                    Err(_) => break,
                }
            }
        })
    };

    let mut sink = RecordingSink::new();
    let deadline = Instant::now() + Duration::from_secs(20);
    let mut seen = false;
    let mut slowest = Duration::ZERO;
    while Instant::now() < deadline {
        let started = Instant::now();
        server.poll(&control, &mut sink);
        slowest = slowest.max(started.elapsed());
        match server.connected() {
            0 if seen => break,
            0 => std::thread::sleep(Duration::from_millis(1)),
            _ => seen = true,
        }
    }
    stop.store(true, Ordering::SeqCst);
    flooder.join().unwrap();

    assert!(seen, "flooding client was never accepted");
    assert_eq!(server.connected(), 0, "a client that never reads must be dropped");
    // Each poll handles a bounded slice of input; the margin covers a
    // loaded test host.
    assert!(slowest < Duration::from_millis(50), "slowest poll took {slowest:?}");
}
