//! The engine's internal response representation.
//!
//! An [`HttpResponse`] carries an HTTP-like status code, an optional binary
//! payload with explicit length, an optional modification timestamp, and a
//! multi-valued header table. The payload is a [`Bytes`] buffer and is never
//! treated as a terminated string: embedded zero bytes are ordinary data
//! (tile payloads are usually compressed images).

use std::time::SystemTime;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

/// Internal representation of an HTTP-like result.
///
/// If the status code indicates success the payload should be present; a
/// response that went through dispatch without any payload or code is an
/// error condition handled by the marshaler, not a valid empty result.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP-like status code.
    pub code: u16,

    /// Binary payload; its length is authoritative.
    pub body: Option<Bytes>,

    /// Modification time of the underlying resource, when known.
    pub mtime: Option<SystemTime>,

    /// Header table. A name may carry multiple values; value order per name
    /// is insertion order.
    pub headers: HeaderMap,
}

impl HttpResponse {
    /// Create an empty response with the given status code.
    pub fn new(code: u16) -> Self {
        Self {
            code,
            body: None,
            mtime: None,
            headers: HeaderMap::new(),
        }
    }

    /// Create a `200 OK` response with the given payload.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK.as_u16()).with_body(body)
    }

    /// Create a plain-text error response.
    ///
    /// Used by engines to satisfy the "always exactly one response" rule on
    /// failure paths.
    pub fn error(code: u16, message: &str) -> Self {
        Self::new(code)
            .with_body(Bytes::from(message.as_bytes().to_vec()))
            .with_header("content-type", "text/plain")
    }

    /// Attach a payload.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a modification timestamp.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Append a header value, keeping any existing values for the name.
    ///
    /// Invalid header names or values are ignored rather than panicking;
    /// engines produce these from trusted constants and cache metadata.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Whether the status code is in the success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================
