//! Response marshaling for the main-thread completion handler.
//!
//! Converts the engine's internal response representation into the
//! boundary-visible [`CacheResult`]: status code as-is, modification time
//! only if one was set, payload only if one was set (length taken from the
//! response exactly, binary-safe, never string-terminated), and the header
//! table as ordered lists of values per name. A context that somehow reached
//! completion without a response yields [`GetError::MissingResponse`]
//! through the error slot instead.

use std::time::SystemTime;

use bytes::Bytes;
use tracing::{debug, error};

use crate::engine::HttpResponse;
use crate::error::GetError;

use super::context::RequestContext;

// =============================================================================
// Boundary Result
// =============================================================================

/// The boundary-visible result of a successful dispatch.
///
/// Engine/business failures also arrive here, as an error-shaped result with
/// a non-success `code`; only internal defects and worker failures use the
/// callback's error slot.
#[derive(Debug, Clone)]
pub struct CacheResult {
    /// HTTP-like status code.
    pub code: u16,

    /// Modification time, present only if the engine set one.
    pub mtime: Option<SystemTime>,

    /// Binary payload, present only if the engine set one. The buffer length
    /// is exactly the payload size reported by the engine.
    pub data: Option<Bytes>,

    /// Header names with their ordered value lists; `None` when the engine
    /// set no headers.
    pub headers: Option<Vec<(String, Vec<String>)>>,
}

impl CacheResult {
    /// Build a boundary result from a response model.
    pub fn from_response(response: &HttpResponse) -> Self {
        let headers = if response.headers.is_empty() {
            None
        } else {
            let mut out: Vec<(String, Vec<String>)> = Vec::new();
            for name in response.headers.keys() {
                let values = response
                    .headers
                    .get_all(name)
                    .iter()
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                    .collect();
                out.push((name.as_str().to_string(), values));
            }
            Some(out)
        };

        Self {
            code: response.code,
            mtime: response.mtime,
            data: response.body.clone(),
            headers,
        }
    }

    /// Values for a header name, compared ASCII case-insensitively.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, values)| values.as_slice())
        })
    }

    /// Whether the status code is in the success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

// =============================================================================
// Marshaling
// =============================================================================

/// Marshal a completed context into the callback's two-slot result.
///
/// Exactly one slot is populated: the result, or (when the worker attached
/// no response, which is an internal defect) the error.
pub(crate) fn marshal(context: &RequestContext) -> Result<CacheResult, GetError> {
    if let Some(diagnostic) = context.diagnostic() {
        debug!(diagnostic = %diagnostic, "request completed with diagnostic");
    }

    match context.response() {
        Some(response) => Ok(CacheResult::from_response(response)),
        None => {
            error!(
                path_info = %context.path_info(),
                "worker execution attached no response"
            );
            Err(GetError::MissingResponse)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
