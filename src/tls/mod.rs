//! TLS transport
//!
//! Encrypted connections for the polling client, built on the `openssl`
//! crate:
//!
//! 1. [`TlsConfig`] holds the client-side TLS settings (SNI servername,
//!    optional peer verification)
//! 2. [`TlsTransport`] implements the [`crate::session::Transport`] trait
//!    over an `SslStream`, so the session and client code are transparent
//!    to the encryption
//! 3. [`TlsConnector`] performs the resolve → TCP connect → handshake →
//!    non-blocking switchover sequence for every (re)connect
//!
//! The handshake runs in blocking mode; the socket is switched to
//! non-blocking only once the session is established, so the poll loop
//! never sees a half-negotiated connection.

pub mod config;
pub mod session;

pub use config::{TlsConfig, TlsConfigBuilder, TlsError};
pub use session::{TlsConnector, TlsTransport};

/// Result type for TLS operations
pub type Result<T> = std::result::Result<T, TlsError>;
