//! httpoll - a latency-sensitive polling HTTP/1.1 client
//!
//! This crate provides a small, single-threaded HTTP/1.1 client built for
//! tight polling loops against one remote host (a trading venue, a metrics
//! endpoint). Reads never block, responses are decoded incrementally as
//! bytes arrive, and each poll cycle does a bounded amount of work.
//!
//! # Architecture
//!
//! - [`session::Session`] owns the connection lifecycle and performs
//!   non-blocking reads and deadline-bounded writes over a [`session::Transport`]
//! - [`parser::ResponseParser`] consumes raw bytes and emits completed
//!   responses into a fixed-capacity queue
//! - [`client::Client`] drives one poll cycle at a time: drain bytes, feed
//!   the parser, deliver at most one response, reconnect when the server
//!   declares the connection closed
//!
//! Transports are pluggable through the [`session::Connector`] trait, so the
//! same client logic runs over TLS ([`tls::TlsConnector`]) and plain TCP
//! ([`session::TcpConnector`]).
//!
//! # Examples
//!
//! ```no_run
//! use httpoll::client::{Client, ClientConfig};
//! use httpoll::response::Response;
//!
//! let config = ClientConfig::new("api.example.com", 443);
//! let mut client = Client::connect(config, |response: Response| {
//!     println!("{}: {} bytes", response.status(), response.content().len());
//! }).unwrap();
//!
//! client.get("/v1/ticker", "").unwrap();
//! loop {
//!     client.poll().unwrap();
//! }
//! ```

pub mod client;
pub mod net;
pub mod parser;
pub mod queue;
pub mod request;
pub mod response;
pub mod session;
pub mod tls;

pub use client::{Client, ClientConfig, PollMode};
pub use parser::ResponseParser;
pub use queue::ResponseQueue;
pub use request::Method;
pub use response::{Responder, Response};
pub use session::{Connector, Session, SessionState, TcpConnector, Transport};
pub use tls::{TlsConfig, TlsConnector};

use std::time::Duration;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Client operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connect(#[from] net::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] tls::TlsError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("transport read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("transport write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("parser stalled with {buffered} bytes buffered and no completed response")]
    StalledParse { buffered: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capacity of the response queue; the oldest unread response is evicted
/// when a new one arrives at capacity.
pub const RESPONSE_QUEUE_CAPACITY: usize = 1024;

/// CRLF line ending
pub const CRLF: &str = "\r\n";
