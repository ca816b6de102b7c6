//! Minimal newline-delimited TCP collector for transport tests.

use std::{
    io::{BufRead, BufReader},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

/// Accepts any number of connections and forwards each received line.
pub struct LineServer {
    addr: SocketAddr,
    lines: mpsc::Receiver<String>,
    accepted: Arc<AtomicUsize>,
}

impl LineServer {
    /// Listen on an ephemeral loopback port.
    pub fn start() -> Self {
        Self::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
    }

    pub fn bind(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).expect("bind line server");
        let addr = listener.local_addr().expect("listener has address");
        let (tx, lines) = mpsc::channel();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let tx = tx.clone();
                thread::spawn(move || {
                    for line in BufReader::new(stream).lines() {
                        let Ok(line) = line else { break };
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        Self {
            addr,
            lines,
            accepted,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn recv_line(&self, timeout: Duration) -> Option<String> {
        self.lines.recv_timeout(timeout).ok()
    }

    /// Collect up to `count` lines, giving up once `timeout` has elapsed.
    pub fn collect(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => out.push(line),
                Err(_) => break,
            }
        }
        out
    }
}

/// Accepts connections and never reads from them, so writers eventually
/// block once the socket buffers fill.
pub struct StalledServer {
    addr: SocketAddr,
    held: Arc<Mutex<Vec<TcpStream>>>,
}

impl StalledServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind stalled server");
        let addr = listener.local_addr().expect("listener has address");
        let held = Arc::new(Mutex::new(Vec::new()));
        let streams = Arc::clone(&held);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                streams.lock().push(stream);
            }
        });
        Self { addr, held }
    }

    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    pub fn accepted(&self) -> usize {
        self.held.lock().len()
    }
}

/// A loopback address with nothing listening on it.
pub fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind scratch listener");
    listener.local_addr().expect("scratch listener has address")
}
