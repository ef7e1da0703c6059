//! Request assembly
//!
//! Requests are literal HTTP/1.1 text written into a scratch buffer that is
//! reused across calls, so steady-state request issuance allocates nothing.

use bytes::BytesMut;
use std::fmt;

/// Supported request methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reusable request scratch buffer.
///
/// `build` clears and refills the buffer, returning a borrow of the
/// assembled wire text. Extra headers are caller-supplied pre-formatted
/// `Name: value\r\n` lines.
pub struct RequestBuf {
    buf: BytesMut,
}

impl RequestBuf {
    pub fn new(capacity: usize) -> Self {
        RequestBuf {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Assemble one request.
    ///
    /// Layout: method line, `Host`, `Accept: */*`, `Connection: keep-alive`,
    /// caller headers, then for a non-empty body `Content-Type` (when
    /// given), `Content-Length` and the body itself.
    pub fn build(
        &mut self,
        method: Method,
        path: &str,
        host: &str,
        extra_headers: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> &[u8] {
        self.buf.clear();
        self.buf.extend_from_slice(method.as_str().as_bytes());
        self.buf.extend_from_slice(b" ");
        self.buf.extend_from_slice(path.as_bytes());
        self.buf.extend_from_slice(b" HTTP/1.1\r\nHost: ");
        self.buf.extend_from_slice(host.as_bytes());
        self.buf
            .extend_from_slice(b"\r\nAccept: */*\r\nConnection: keep-alive\r\n");
        self.buf.extend_from_slice(extra_headers.as_bytes());

        if body.is_empty() {
            self.buf.extend_from_slice(b"\r\n");
            return &self.buf;
        }

        if let Some(content_type) = content_type {
            self.buf.extend_from_slice(b"Content-Type: ");
            self.buf.extend_from_slice(content_type.as_bytes());
            self.buf.extend_from_slice(b"\r\n");
        }
        self.buf.extend_from_slice(b"Content-Length: ");
        self.buf
            .extend_from_slice(body.len().to_string().as_bytes());
        self.buf.extend_from_slice(b"\r\n\r\n");
        self.buf.extend_from_slice(body);

        &self.buf
    }
}
