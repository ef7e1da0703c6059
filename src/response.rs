//! Response type and the handler boundary

use bytes::Bytes;

/// A completed HTTP response.
///
/// Constructed by the parser only once the full declared body has
/// accumulated. The content is a zero-copy slice of the receive arena;
/// ownership moves to the handler on delivery.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    content: Bytes,
}

impl Response {
    pub(crate) fn new(status: u16, content: Bytes) -> Self {
        Response { status, content }
    }

    /// Status code from the response line
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response body
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consume the response, keeping only the body
    pub fn into_content(self) -> Bytes {
        self.content
    }

    /// True for 2xx status codes
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Receives delivered responses, one per invocation.
///
/// Implemented for every `FnMut(Response)` closure, so a plain closure can
/// be passed wherever a responder is expected.
pub trait Responder {
    fn on_response(&mut self, response: Response);
}

impl<F: FnMut(Response)> Responder for F {
    fn on_response(&mut self, response: Response) {
        self(response)
    }
}
