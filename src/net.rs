//! Address resolution and TCP connection establishment
//!
//! Resolution returns the candidate addresses in the order the resolver
//! produced them; connection attempts walk that order and stop at the first
//! success. `TCP_NODELAY` is enabled on every candidate socket before the
//! connect, so a successful connection never sends coalesced.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use tracing::debug;

/// Result type for network operations
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("address resolution failed for {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        source: io::Error,
    },

    #[error("no addresses resolved for {host}:{port}")]
    NoAddresses { host: String, port: u16 },

    #[error("all {count} candidate addresses for {host}:{port} failed, last error: {source}")]
    AllCandidatesFailed {
        host: String,
        port: u16,
        count: usize,
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Resolve a host and port to an ordered list of candidate addresses.
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| Error::Resolve {
            host: host.to_string(),
            port,
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(Error::NoAddresses {
            host: host.to_string(),
            port,
        });
    }

    Ok(addrs)
}

/// Connect to the first candidate address that accepts, with `TCP_NODELAY`
/// set before the connect.
///
/// No retry loop: every candidate is tried once, in order, and the last
/// OS error is surfaced if all of them fail.
pub fn connect_any(host: &str, port: u16, addrs: &[SocketAddr]) -> Result<TcpStream> {
    let mut last_err = io::Error::new(io::ErrorKind::NotConnected, "no candidates tried");

    for addr in addrs {
        match connect_one(addr) {
            Ok(stream) => {
                debug!(%addr, "connected");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "connect attempt failed");
                last_err = e;
            }
        }
    }

    Err(Error::AllCandidatesFailed {
        host: host.to_string(),
        port,
        count: addrs.len(),
        source: last_err,
    })
}

fn connect_one(addr: &SocketAddr) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nodelay(true)?;
    socket.connect(&(*addr).into())?;
    Ok(socket.into())
}
