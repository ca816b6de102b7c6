//! TCP transport for the upstream hooks.

use std::{
    io::{self, Write},
    net::TcpStream,
    time::{Duration, Instant},
};

use super::endpoint::UpstreamEndpoint;

// Longer timeouts are clamped so deadlines stay representable.
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Instant `timeout` from now.
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout.min(MAX_WAIT)
}

fn time_left(deadline: Instant) -> io::Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(io::Error::new(io::ErrorKind::TimedOut, "deadline passed"));
    }
    Ok(left)
}

/// Live connection to a collector.
#[derive(Debug)]
pub struct UpstreamConnection {
    stream: TcpStream,
}

impl UpstreamConnection {
    /// Dial `endpoint` once. `connect_timeout` covers every resolved address
    /// together, not each one.
    ///
    /// A zero `write_timeout` leaves writes unbounded.
    pub fn connect(
        endpoint: &UpstreamEndpoint,
        connect_timeout: Duration,
        write_timeout: Duration,
    ) -> io::Result<Self> {
        Self::connect_by(endpoint, deadline_after(connect_timeout), write_timeout)
    }

    /// Dial `endpoint`, trying resolved addresses in turn until one answers
    /// or `deadline` passes.
    pub fn connect_by(
        endpoint: &UpstreamEndpoint,
        deadline: Instant,
        write_timeout: Duration,
    ) -> io::Result<Self> {
        let mut last_err = None;
        for addr in endpoint.socket_addrs()? {
            let left = match time_left(deadline) {
                Ok(left) => left,
                Err(err) => {
                    last_err = Some(err);
                    break;
                }
            };
            match TcpStream::connect_timeout(&addr, left) {
                Ok(stream) => {
                    stream.set_nonblocking(false)?;
                    stream.set_write_timeout((!write_timeout.is_zero()).then_some(write_timeout))?;
                    stream.set_nodelay(true)?;
                    return Ok(Self { stream });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no addresses resolved for {endpoint}"),
            )
        }))
    }

    /// Write `line` followed by a newline.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.stream.write_all(&framed(line))?;
        self.stream.flush()
    }

    /// Like [`write_line`](Self::write_line), but the whole line must go out
    /// before `deadline`, however many partial writes it takes.
    pub fn write_line_by(&mut self, line: &str, deadline: Instant) -> io::Result<()> {
        let buf = framed(line);
        let mut written = 0;
        while written < buf.len() {
            self.stream.set_write_timeout(Some(time_left(deadline)?))?;
            match self.stream.write(&buf[written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        self.stream.flush()
    }
}

fn framed(line: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    buf
}
