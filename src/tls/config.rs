//! TLS configuration
//!
//! Client-only configuration builder. Peer verification is off by default:
//! the intended deployments pin a single well-known host and favor
//! handshake latency; switch it on with [`TlsConfigBuilder::verify_peer`].

use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslVerifyMode};

/// TLS errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
}

/// TLS configuration (immutable after building)
#[derive(Clone)]
pub struct TlsConfig {
    pub(crate) ctx: SslContext,
    pub(crate) servername: Option<String>,
}

impl TlsConfig {
    /// Create a new client configuration builder
    pub fn client() -> TlsConfigBuilder {
        TlsConfigBuilder::new()
    }

    /// The configured SNI override, if any.
    ///
    /// When unset, the connector uses the connect host as the servername.
    pub fn servername(&self) -> Option<&str> {
        self.servername.as_deref()
    }
}

/// Client configuration builder
pub struct TlsConfigBuilder {
    ctx_builder: SslContextBuilder,
    servername: Option<String>,
    verify_peer: bool,
}

impl TlsConfigBuilder {
    fn new() -> Self {
        let mut ctx_builder =
            SslContextBuilder::new(SslMethod::tls_client()).expect("Failed to create SSL context");

        ctx_builder.set_verify(SslVerifyMode::NONE);

        TlsConfigBuilder {
            ctx_builder,
            servername: None,
            verify_peer: false,
        }
    }

    /// Override the SNI servername sent during the handshake
    pub fn servername(mut self, name: impl Into<String>) -> Self {
        self.servername = Some(name.into());
        self
    }

    /// Verify the server certificate against the platform trust store
    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    /// Build the configuration
    pub fn build(mut self) -> super::Result<TlsConfig> {
        if self.verify_peer {
            self.ctx_builder.set_default_verify_paths()?;
            self.ctx_builder.set_verify(SslVerifyMode::PEER);
        }

        Ok(TlsConfig {
            ctx: self.ctx_builder.build(),
            servername: self.servername,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_client_config() {
        let config = TlsConfig::client().build().unwrap();
        assert!(config.servername().is_none());
    }

    #[test]
    fn test_servername_override() {
        let config = TlsConfig::client()
            .servername("venue.example.com")
            .build()
            .unwrap();
        assert_eq!(config.servername(), Some("venue.example.com"));
    }

    #[test]
    fn test_verify_peer_builds() {
        let config = TlsConfig::client().verify_peer(true).build();
        assert!(config.is_ok());
    }
}
