//! Per-request state.
//!
//! A [`RequestContext`] carries one request's inputs, working memory, and
//! eventual response. It is created on the main thread, moved wholly into
//! the worker closure, and moved wholly back for marshaling. Ownership
//! transfers at each hand-off, so no field is ever reachable from both
//! threads at once.

use std::sync::Arc;

use crate::arena::{Arena, ArenaStr};
use crate::engine::{HttpResponse, RequestScope};
use crate::error::ArenaError;
use crate::lock::ProcessLock;

use super::handle::CacheInner;

/// The per-call object for one submitted request.
///
/// Owns a child arena of the cache handle's process-wide arena, the three
/// caller-supplied strings duplicated into that arena (the caller's
/// originals may go out of scope immediately after submission), a
/// cross-process lock handle, a diagnostic slot, and (once the worker has
/// run) the response model.
///
/// A context is touched by exactly one worker-thread execution and exactly
/// one main-thread completion, never concurrently.
pub struct RequestContext {
    /// Keeps the owning handle alive while this request is outstanding.
    pub(crate) handle: Arc<CacheInner>,

    /// Private arena; released when the context is dropped.
    pub(crate) arena: Arena,

    pub(crate) base_url: ArenaStr,
    pub(crate) path_info: ArenaStr,
    pub(crate) query_string: ArenaStr,

    /// Lock handle bound to the handle-wide lock path, handed to engine
    /// operations through the request scope.
    pub(crate) lock: ProcessLock,

    /// Diagnostic from a failed classification or operation, if any.
    pub(crate) diagnostic: Option<String>,

    /// Exactly one response is attached by the worker on every path.
    pub(crate) response: Option<HttpResponse>,
}

impl RequestContext {
    pub(crate) fn new(
        handle: &Arc<CacheInner>,
        base_url: &str,
        path_info: &str,
        query_string: &str,
    ) -> Result<Self, ArenaError> {
        let arena = handle.arena.child("request");
        let base_url = arena.alloc_str(base_url)?;
        let path_info = arena.alloc_str(path_info)?;
        let query_string = arena.alloc_str(query_string)?;

        Ok(Self {
            handle: Arc::clone(handle),
            arena,
            base_url,
            path_info,
            query_string,
            lock: ProcessLock::new(handle.lock_path.clone()),
            diagnostic: None,
            response: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// The response attached by worker-side execution, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    /// The diagnostic recorded for this request, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Borrow the per-request resources as a scope for engine operations.
    pub(crate) fn scope(&mut self) -> RequestScope<'_> {
        RequestScope {
            arena: &self.arena,
            config: &self.handle.config,
            lock: &mut self.lock,
        }
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        // Bulk-release everything the request allocated. Handed-out
        // response payloads are reference-counted and stay valid.
        self.arena.release();
    }
}
