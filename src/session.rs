//! Transport session lifecycle and non-blocking I/O
//!
//! The session layer separates two concerns:
//!
//! - [`Transport`] is one established connection (plain TCP or TLS) with
//!   non-blocking read/write and a bounded readiness wait
//! - [`Session`] is the lifecycle state machine around it: connect,
//!   teardown, reconnect flagging, and the two I/O primitives the client
//!   loop needs: `read_available` (drain whatever is there, never block)
//!   and `write_all` (complete the write or fail within a deadline)
//!
//! A [`Connector`] produces a fresh transport per (re)connect; the session
//! never reuses partial state across connections.

use crate::{net, Error, Result};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::time::{Duration, Instant};
use tracing::debug;

/// Readiness events for [`Transport::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvents {
    Read,
    Write,
}

/// One established connection.
///
/// Reads and writes are non-blocking: both return `WouldBlock` when the
/// transport cannot make progress right now.
pub trait Transport {
    /// Wait until the transport is ready for the requested operation, up to
    /// `timeout` (`None` waits indefinitely). Returns false on timeout.
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> io::Result<bool>;

    /// Read available bytes into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write bytes from `buf`, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Best-effort teardown. Must tolerate repeated calls.
    fn shutdown(&mut self);
}

/// Produces a fresh [`Transport`] for every (re)connect.
pub trait Connector {
    type Transport: Transport;

    fn connect(&self) -> Result<Self::Transport>;
}

/// Poll a raw file descriptor for readiness.
pub(crate) fn poll_fd(fd: RawFd, events: PollEvents, timeout: Option<Duration>) -> io::Result<bool> {
    use libc::{poll, pollfd, POLLIN, POLLOUT};

    let mut pfd = pollfd {
        fd,
        events: match events {
            PollEvents::Read => POLLIN,
            PollEvents::Write => POLLOUT,
        },
        revents: 0,
    };

    let timeout_ms = timeout.map(|d| d.as_millis() as i32).unwrap_or(-1);

    let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

    if result < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(result > 0)
}

/// Plain TCP transport
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Wrap a connected stream, switching it to non-blocking mode.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(TcpTransport { stream })
    }
}

impl Transport for TcpTransport {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> io::Result<bool> {
        poll_fd(self.stream.as_raw_fd(), events, timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn shutdown(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Connector for cleartext endpoints (and the test seam).
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        TcpConnector {
            host: host.into(),
            port,
        }
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(&self) -> Result<TcpTransport> {
        let addrs = net::resolve(&self.host, self.port)?;
        let stream = net::connect_any(&self.host, self.port, &addrs)?;
        TcpTransport::new(stream).map_err(Error::Io)
    }
}

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Transport session: one connection handle and the state machine around it.
///
/// The handle is destroyed and recreated wholesale on reconnect; no partial
/// state survives a connection swap.
pub struct Session<C: Connector> {
    connector: C,
    transport: Option<C::Transport>,
    state: SessionState,
    scratch: Vec<u8>,
    read_chunk: usize,
    write_deadline: Duration,
}

impl<C: Connector> Session<C> {
    pub fn new(connector: C, read_chunk: usize, write_deadline: Duration) -> Self {
        Session {
            connector,
            transport: None,
            state: SessionState::Disconnected,
            scratch: Vec::with_capacity(read_chunk),
            read_chunk,
            write_deadline,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Establish a fresh connection.
    ///
    /// No retry loop: a failed attempt leaves the session `Failed` and
    /// surfaces the error; the caller decides whether to try again.
    pub fn connect(&mut self) -> Result<()> {
        self.state = SessionState::Connecting;
        match self.connector.connect() {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = SessionState::Connected;
                debug!("session connected");
                Ok(())
            }
            Err(e) => {
                self.transport = None;
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Best-effort, idempotent teardown.
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown();
            debug!("session disconnected");
        }
        self.state = SessionState::Disconnected;
    }

    /// Flag the session so the next cycle tears it down and reconnects.
    pub fn request_reconnect(&mut self) {
        if self.state == SessionState::Connected {
            self.state = SessionState::Disconnected;
        }
    }

    /// Write the whole buffer, or fail.
    ///
    /// `WouldBlock` from the transport is retried after waiting for
    /// writability, bounded by the session's write deadline. Every other
    /// failure is fatal and surfaced immediately; there is no partial-write
    /// recovery.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;

        let deadline = Instant::now() + self.write_deadline;
        let mut written = 0;

        while written < buf.len() {
            match transport.write(&buf[written..]) {
                Ok(0) => {
                    self.state = SessionState::Failed;
                    return Err(Error::ConnectionClosed);
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.state = SessionState::Failed;
                        return Err(Error::WriteTimeout(self.write_deadline));
                    }
                    transport
                        .poll(PollEvents::Write, Some(deadline - now))
                        .map_err(Error::Io)?;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.state = SessionState::Failed;
                    return Err(Error::Write(e));
                }
            }
        }

        Ok(())
    }

    /// Drain whatever bytes are currently available, never blocking.
    ///
    /// Reads in `read_chunk`-sized steps until a short read or `WouldBlock`
    /// and returns the concatenation, which may be empty. A zero-byte read
    /// means the peer closed; the session is marked `Failed` so the caller
    /// reconnects on its next cycle.
    pub fn read_available(&mut self) -> Result<&[u8]> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;

        self.scratch.clear();
        let chunk = self.read_chunk;

        loop {
            let start = self.scratch.len();
            self.scratch.resize(start + chunk, 0);
            match transport.read(&mut self.scratch[start..]) {
                Ok(0) => {
                    self.scratch.truncate(start);
                    self.state = SessionState::Failed;
                    debug!("peer closed connection");
                    break;
                }
                Ok(n) => {
                    self.scratch.truncate(start + n);
                    if n < chunk {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.scratch.truncate(start);
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.scratch.truncate(start);
                }
                Err(e) => {
                    self.scratch.truncate(start);
                    self.state = SessionState::Failed;
                    return Err(Error::Read(e));
                }
            }
        }

        Ok(&self.scratch)
    }

    /// Wait up to `timeout` for the transport to become readable.
    ///
    /// Opt-in bounded wait for callers that prefer sleeping over spinning.
    pub fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        let transport = self.transport.as_ref().ok_or(Error::NotConnected)?;
        transport
            .poll(PollEvents::Read, Some(timeout))
            .map_err(Error::Io)
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
