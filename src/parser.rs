//! Incremental response parsing
//!
//! The parser is a four-phase cursor over an append-only byte accumulator.
//! Each `feed` appends the new bytes and runs the phases once, in order, so
//! at most one response completes per call and per-poll work stays bounded.
//! A phase that cannot find its anchor token yet simply waits for more
//! bytes; nothing already examined is re-parsed once consumed.
//!
//! Header recognition is strict-order: the status line, then the
//! `Connection` header, then `Content-Length`, then the header terminator.
//! A server that reorders those headers stalls the cursor; rather than
//! wedge silently, `feed` fails with [`Error::StalledParse`] once the
//! accumulator exceeds a configurable bound without emitting a response.

use crate::queue::ResponseQueue;
use crate::response::{Responder, Response};
use crate::{Error, Result, RESPONSE_QUEUE_CAPACITY};
use bytes::BytesMut;

const STATUS_LINE_PREFIX: &[u8] = b"HTTP/1.1 ";
const CONNECTION_PREFIX: &[u8] = b"Connection: ";
const CONTENT_LENGTH_PREFIX: &[u8] = b"Content-Length: ";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const KEEP_ALIVE: &[u8] = b"keep-alive";

/// Default initial capacity of the receive arena
pub const DEFAULT_RECV_BUFFER: usize = 4096;

/// Default bound on buffered bytes without a completed response
pub const DEFAULT_STALL_LIMIT: usize = 1024 * 1024;

/// Find the first occurrence of `needle` in `haystack`
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    StatusLine,
    Connection,
    ContentLength,
    Body,
}

/// Incremental HTTP/1.1 response parser.
///
/// Owns the receive arena and the bounded queue of completed responses.
/// The cursor survives across `feed` calls and resets only after a
/// response is emitted, or on [`ResponseParser::mark_reconnected`].
pub struct ResponseParser {
    buf: BytesMut,
    phase: Phase,
    status: u16,
    content_length: usize,
    keep_alive: bool,
    stall_limit: usize,
    queue: ResponseQueue,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RECV_BUFFER, DEFAULT_STALL_LIMIT)
    }

    /// Create a parser with an explicit arena capacity and stall bound.
    pub fn with_capacity(recv_buffer: usize, stall_limit: usize) -> Self {
        ResponseParser {
            buf: BytesMut::with_capacity(recv_buffer),
            phase: Phase::StatusLine,
            status: 0,
            content_length: 0,
            keep_alive: true,
            stall_limit,
            queue: ResponseQueue::new(RESPONSE_QUEUE_CAPACITY),
        }
    }

    /// Append received bytes and advance the cursor.
    ///
    /// At most one response is assembled per call, even if the accumulator
    /// holds more than one complete response.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);

        self.scan_status_line();
        self.scan_connection();
        self.scan_content_length();
        self.scan_body();

        if self.buf.len() > self.stall_limit {
            return Err(Error::StalledParse {
                buffered: self.buf.len(),
            });
        }

        Ok(())
    }

    fn scan_status_line(&mut self) {
        if self.phase != Phase::StatusLine {
            return;
        }
        let Some(pos) = find(&self.buf, STATUS_LINE_PREFIX) else {
            return;
        };
        let digits = &self.buf[pos + STATUS_LINE_PREFIX.len()..];
        let Some(end) = digits.iter().position(|&b| b == b' ') else {
            return;
        };

        // Plain digit fold, no sign or range checks: garbage digits yield
        // a garbage status.
        let mut status: u16 = 0;
        for &b in &digits[..end] {
            status = status
                .wrapping_mul(10)
                .wrapping_add(b.wrapping_sub(b'0') as u16);
        }

        self.status = status;
        self.phase = Phase::Connection;
    }

    fn scan_connection(&mut self) {
        if self.phase != Phase::Connection {
            return;
        }
        let Some(pos) = find(&self.buf, CONNECTION_PREFIX) else {
            return;
        };
        let value = &self.buf[pos + CONNECTION_PREFIX.len()..];
        let Some(end) = value.iter().position(|&b| b == b'\r') else {
            return;
        };

        // Anything other than the exact keep-alive token means the server
        // will close this connection after the response.
        if &value[..end] != KEEP_ALIVE {
            self.keep_alive = false;
        }

        self.phase = Phase::ContentLength;
    }

    fn scan_content_length(&mut self) {
        if self.phase != Phase::ContentLength {
            return;
        }
        let Some(pos) = find(&self.buf, CONTENT_LENGTH_PREFIX) else {
            return;
        };
        let digits = &self.buf[pos + CONTENT_LENGTH_PREFIX.len()..];
        let Some(end) = digits.iter().position(|&b| b == b'\r') else {
            return;
        };

        let mut length: usize = 0;
        for &b in &digits[..end] {
            length = length
                .wrapping_mul(10)
                .wrapping_add(b.wrapping_sub(b'0') as usize);
        }

        self.content_length = length;
        self.phase = Phase::Body;
    }

    fn scan_body(&mut self) {
        if self.phase != Phase::Body {
            return;
        }
        let Some(pos) = find(&self.buf, HEADER_TERMINATOR) else {
            return;
        };
        let body_at = pos + HEADER_TERMINATOR.len();
        if self.buf.len() - body_at < self.content_length {
            return;
        }

        // Drain the whole response from the arena head; the body slice is
        // handed out without copying.
        let mut message = self.buf.split_to(body_at + self.content_length);
        let content = message.split_off(body_at).freeze();
        self.queue.push(Response::new(self.status, content));

        self.phase = Phase::StatusLine;
    }

    /// Deliver the oldest queued response, if any. At most one per call.
    pub fn deliver_one(&mut self, handler: &mut dyn Responder) -> bool {
        match self.queue.pop_front() {
            Some(response) => {
                handler.on_response(response);
                true
            }
            None => false,
        }
    }

    /// Whether the server has declared this connection reusable
    pub fn connection_will_persist(&self) -> bool {
        self.keep_alive
    }

    /// Reset the cursor for a fresh connection.
    ///
    /// Buffered bytes from the dead connection are discarded; queued
    /// responses survive.
    pub fn mark_reconnected(&mut self) {
        self.buf.clear();
        self.phase = Phase::StatusLine;
        self.status = 0;
        self.content_length = 0;
        self.keep_alive = true;
    }

    /// Number of responses awaiting delivery
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}
