//! Polling client
//!
//! One [`Client`] owns one transport session and one response parser and
//! drives them from `poll`, called on whatever cadence the caller likes.
//! There is no internal thread or timer; every operation runs on the
//! invoking thread and each cycle does a bounded amount of work: drain
//! available bytes, assemble at most one response, deliver at most one
//! response, and reconnect when the server has declared the connection
//! closed.

use crate::parser::{ResponseParser, DEFAULT_RECV_BUFFER, DEFAULT_STALL_LIMIT};
use crate::request::{Method, RequestBuf};
use crate::response::Responder;
use crate::session::{Connector, Session, SessionState};
use crate::tls::{TlsConfig, TlsConnector};
use crate::Result;
use std::time::Duration;
use tracing::debug;

/// How `poll` waits for incoming bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Return immediately when no bytes are available. Lowest latency,
    /// burns a core when called in a tight loop.
    Busy,
    /// Wait up to the given duration for readability before draining.
    Wait(Duration),
}

/// Client configuration
#[derive(Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// TLS settings; `None` builds a default client configuration.
    pub tls: Option<TlsConfig>,
    /// Read size per non-blocking read call
    pub read_chunk: usize,
    /// Initial capacity of the receive arena
    pub recv_buffer: usize,
    /// Capacity of the reusable request scratch buffer
    pub request_buffer: usize,
    /// Deadline for completing one request write
    pub write_deadline: Duration,
    /// Buffered bytes without a completed response before `poll` fails
    /// with a stalled-parse error
    pub parser_stall_limit: usize,
    pub poll_mode: PollMode,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ClientConfig {
            host: host.into(),
            port,
            tls: None,
            read_chunk: 4096,
            recv_buffer: DEFAULT_RECV_BUFFER,
            request_buffer: 4096,
            write_deadline: Duration::from_secs(5),
            parser_stall_limit: DEFAULT_STALL_LIMIT,
            poll_mode: PollMode::Busy,
        }
    }
}

/// Polling HTTP/1.1 client over one connection.
///
/// Responses are handed to the responder supplied at construction, oldest
/// first, at most one per poll cycle.
pub struct Client<C: Connector = TlsConnector> {
    session: Session<C>,
    parser: ResponseParser,
    request: RequestBuf,
    handler: Box<dyn Responder>,
    host: String,
    poll_mode: PollMode,
}

impl Client<TlsConnector> {
    /// Connect over TLS and return a ready client.
    ///
    /// Fails if resolution, every connect candidate, or the handshake
    /// fails; there is no retry loop.
    pub fn connect(config: ClientConfig, handler: impl Responder + 'static) -> Result<Self> {
        let tls = match config.tls.clone() {
            Some(tls) => tls,
            None => TlsConfig::client().build()?,
        };
        let connector = TlsConnector::new(config.host.clone(), config.port, tls);
        Self::with_connector(connector, config, handler)
    }
}

impl<C: Connector> Client<C> {
    /// Connect through an arbitrary connector.
    pub fn with_connector(
        connector: C,
        config: ClientConfig,
        handler: impl Responder + 'static,
    ) -> Result<Self> {
        let mut session = Session::new(connector, config.read_chunk, config.write_deadline);
        session.connect()?;

        Ok(Client {
            session,
            parser: ResponseParser::with_capacity(config.recv_buffer, config.parser_stall_limit),
            request: RequestBuf::new(config.request_buffer),
            handler: Box::new(handler),
            host: config.host,
            poll_mode: config.poll_mode,
        })
    }

    /// Run one poll cycle.
    ///
    /// Reconnects first if the session is down (propagating a failed
    /// attempt as fatal), drains available bytes into the parser, delivers
    /// at most one queued response, and flags the session for reconnect
    /// when the server declared it will not persist.
    pub fn poll(&mut self) -> Result<()> {
        if !self.session.is_connected() {
            debug!(host = %self.host, "reconnecting");
            self.session.disconnect();
            self.session.connect()?;
            self.parser.mark_reconnected();
        }

        let drain = match self.poll_mode {
            PollMode::Busy => true,
            PollMode::Wait(timeout) => self.session.wait_readable(timeout)?,
        };

        if drain {
            let bytes = self.session.read_available()?;
            if !bytes.is_empty() {
                self.parser.feed(bytes)?;
            }
        }

        self.parser.deliver_one(self.handler.as_mut());

        if !self.parser.connection_will_persist() {
            self.session.request_reconnect();
        }

        Ok(())
    }

    pub fn get(&mut self, path: &str, extra_headers: &str) -> Result<()> {
        self.send(Method::Get, path, extra_headers, None, b"")
    }

    pub fn head(&mut self, path: &str, extra_headers: &str) -> Result<()> {
        self.send(Method::Head, path, extra_headers, None, b"")
    }

    pub fn options(&mut self, path: &str, extra_headers: &str) -> Result<()> {
        self.send(Method::Options, path, extra_headers, None, b"")
    }

    pub fn delete(&mut self, path: &str, extra_headers: &str) -> Result<()> {
        self.send(Method::Delete, path, extra_headers, None, b"")
    }

    pub fn post(
        &mut self,
        path: &str,
        content_type: &str,
        body: &[u8],
        extra_headers: &str,
    ) -> Result<()> {
        self.send(Method::Post, path, extra_headers, Some(content_type), body)
    }

    pub fn put(
        &mut self,
        path: &str,
        content_type: &str,
        body: &[u8],
        extra_headers: &str,
    ) -> Result<()> {
        self.send(Method::Put, path, extra_headers, Some(content_type), body)
    }

    pub fn patch(
        &mut self,
        path: &str,
        content_type: &str,
        body: &[u8],
        extra_headers: &str,
    ) -> Result<()> {
        self.send(Method::Patch, path, extra_headers, Some(content_type), body)
    }

    /// Build and send one request. Failed sends are not retried; the
    /// caller decides whether to re-issue.
    fn send(
        &mut self,
        method: Method,
        path: &str,
        extra_headers: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<()> {
        let wire = self
            .request
            .build(method, path, &self.host, extra_headers, content_type, body);
        self.session.write_all(wire)
    }

    /// Responses parsed but not yet delivered
    pub fn queued(&self) -> usize {
        self.parser.queued()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("api.example.com", 443);
        assert_eq!(config.host, "api.example.com");
        assert_eq!(config.port, 443);
        assert!(config.tls.is_none());
        assert_eq!(config.read_chunk, 4096);
        assert_eq!(config.poll_mode, PollMode::Busy);
    }
}
