//! TLS session transport
//!
//! Implements the [`Transport`] trait over an OpenSSL `SslStream`, and the
//! [`Connector`] that establishes fresh TLS sessions on every (re)connect.

use super::config::{TlsConfig, TlsError};
use crate::session::{poll_fd, Connector, PollEvents, Transport};
use crate::{net, Result as ClientResult};
use openssl::ssl::{Ssl, SslStream};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::time::Duration;
use tracing::debug;

/// Encrypted transport over one TCP connection.
///
/// Reads and writes go through the TLS record layer; with the underlying
/// socket non-blocking, renegotiation-style wants surface as `WouldBlock`
/// like any other retryable condition.
pub struct TlsTransport {
    stream: SslStream<TcpStream>,
}

impl TlsTransport {
    /// Perform the client handshake over an established TCP connection.
    ///
    /// SNI is set to `host` unless the config carries an override. The
    /// handshake runs with the socket still blocking; the switch to
    /// non-blocking happens after it completes.
    pub fn handshake(tcp: TcpStream, config: &TlsConfig, host: &str) -> super::Result<Self> {
        let mut ssl = Ssl::new(&config.ctx)?;

        let servername = config.servername.as_deref().unwrap_or(host);
        ssl.set_hostname(servername)?;

        let stream = match ssl.connect(tcp) {
            Ok(stream) => stream,
            Err(e) => {
                return Err(TlsError::HandshakeFailed(format!(
                    "connection to {servername} failed: {e}"
                )));
            }
        };

        debug!(
            cipher = stream.ssl().current_cipher().map(|c| c.name()),
            "TLS session established"
        );

        stream.get_ref().set_nonblocking(true)?;

        Ok(TlsTransport { stream })
    }
}

impl Transport for TlsTransport {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> io::Result<bool> {
        // Decrypted bytes already buffered inside the TLS layer count as
        // readable; the socket alone cannot see them.
        if events == PollEvents::Read && self.stream.ssl().pending() > 0 {
            return Ok(true);
        }

        poll_fd(self.stream.get_ref().as_raw_fd(), events, timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn shutdown(&mut self) {
        let _ = self.stream.shutdown();
        let _ = self.stream.get_ref().shutdown(Shutdown::Both);
    }
}

/// Connector establishing TLS sessions to one host and port.
pub struct TlsConnector {
    host: String,
    port: u16,
    config: TlsConfig,
}

impl TlsConnector {
    pub fn new(host: impl Into<String>, port: u16, config: TlsConfig) -> Self {
        TlsConnector {
            host: host.into(),
            port,
            config,
        }
    }
}

impl Connector for TlsConnector {
    type Transport = TlsTransport;

    fn connect(&self) -> ClientResult<TlsTransport> {
        let addrs = net::resolve(&self.host, self.port)?;
        let tcp = net::connect_any(&self.host, self.port, &addrs)?;
        let transport = TlsTransport::handshake(tcp, &self.config, &self.host)?;
        Ok(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::net::TcpListener;

    #[test]
    fn test_connector_surfaces_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = TlsConfig::client().build().unwrap();
        let connector = TlsConnector::new("127.0.0.1", port, config);

        let result = connector.connect();
        assert!(matches!(result, Err(Error::Connect(_))));
    }

    #[test]
    fn test_handshake_against_non_tls_peer_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        // Peer accepts and immediately closes; the handshake cannot complete.
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            drop(stream);
        });

        let config = TlsConfig::client().build().unwrap();
        let connector = TlsConnector::new("127.0.0.1", addr.port(), config);

        let result = connector.connect();
        assert!(matches!(result, Err(Error::Tls(_))));

        handle.join().unwrap();
    }
}
