//! The long-lived cache handle and the dispatch entry point.
//!
//! A [`Cache`] owns one parsed configuration tree and the process-wide
//! arena it is bound to. Requests are submitted with [`Cache::get`], which
//! returns immediately: worker-side execution runs on the blocking pool and
//! the completion callback is invoked back on the submitting (local)
//! thread. The handle cannot be closed while requests are in flight.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::arena::Arena;
use crate::config::{ConfigLoader, ConfigTree};
use crate::engine::CacheEngine;
use crate::error::{CloseError, GetError, OpenError, SubmitError};
use crate::lock::DEFAULT_LOCK_PATH;

use super::context::RequestContext;
use super::marshal::{self, CacheResult};
use super::worker;

/// Shared state behind a cache handle.
pub(crate) struct CacheInner {
    /// Read-only after `open`; read concurrently by in-flight workers.
    pub(crate) config: ConfigTree,

    /// Process-wide arena; request arenas are children of it.
    pub(crate) arena: Arena,

    pub(crate) engine: Arc<dyn CacheEngine>,

    /// Lock file path shared by all cooperating processes.
    pub(crate) lock_path: PathBuf,

    /// Number of requests submitted but not yet completed.
    pending: AtomicUsize,

    closed: AtomicBool,
}

/// Decrements the pending-request counter when the completion task ends,
/// on every path including callback panics.
struct PendingGuard {
    inner: Arc<CacheInner>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.inner.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A configured instance of the caching engine.
///
/// Created once with [`Cache::open`] and used for the lifetime of the
/// service. Cloning is cheap and shares the same underlying handle.
///
/// # Threading
///
/// [`Cache::get`] must be called from within a tokio [`LocalSet`] (or a
/// current-thread runtime driving one): completion callbacks are not
/// required to be `Send` and are invoked on the submitting thread.
///
/// [`LocalSet`]: tokio::task::LocalSet
#[derive(Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("lock_path", &self.inner.lock_path)
            .field("pending", &self.inner.pending.load(Ordering::SeqCst))
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Cache {
    /// Open a cache handle for the configuration file at `config_path`.
    ///
    /// Three steps, each of which fails independently and short-circuits the
    /// rest: create the process-wide arena, parse the configuration into a
    /// tree bound to it, and run the post-parse validation/linking pass.
    /// Failure messages always include the configuration path and the
    /// underlying diagnostic.
    pub fn open(
        config_path: impl AsRef<Path>,
        loader: &dyn ConfigLoader,
        engine: Arc<dyn CacheEngine>,
    ) -> Result<Cache, OpenError> {
        let path = config_path.as_ref();
        let arena = Arena::new("process");

        let mut config = loader.parse(path, &arena)?;
        loader.post_configure(&mut config)?;

        let lock_path = config
            .lock_path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_PATH));

        info!(
            path = %path.display(),
            services = config.services().len(),
            tilesets = config.tilesets().len(),
            lock_path = %lock_path.display(),
            "cache handle opened"
        );

        Ok(Cache {
            inner: Arc::new(CacheInner {
                config,
                arena,
                engine,
                lock_path,
                pending: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// The configuration tree this handle was opened with.
    pub fn config(&self) -> &ConfigTree {
        &self.inner.config
    }

    /// The lock file path used for cross-process regeneration locking.
    pub fn lock_path(&self) -> &Path {
        &self.inner.lock_path
    }

    /// Number of requests submitted but not yet completed.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Bytes currently retained by the process-wide arena.
    pub fn allocated_bytes(&self) -> usize {
        self.inner.arena.allocated_bytes()
    }

    /// Submit a request for asynchronous execution.
    ///
    /// Validates the arguments, duplicates the three strings into a fresh
    /// per-request arena (the caller's originals may be dropped as soon as
    /// this returns), and enqueues worker-side execution. Returns
    /// immediately; the caller observes completion only through `callback`,
    /// which fires exactly once with either an error or a result, never
    /// both and never neither.
    ///
    /// Worker-side execution always completes entirely, all its writes
    /// visible, before the callback begins. No ordering is guaranteed
    /// between distinct requests: they may complete in any order.
    ///
    /// # Errors
    ///
    /// Fails synchronously, before any worker is involved, if the handle is
    /// closed, the base URL is empty, the path info does not begin with
    /// `/`, the per-request arena cannot be set up, or the submitting
    /// thread is not driving a local task set.
    pub fn get<F>(
        &self,
        base_url: &str,
        path_info: &str,
        query_string: &str,
        callback: F,
    ) -> Result<(), SubmitError>
    where
        F: FnOnce(Result<CacheResult, GetError>) + 'static,
    {
        if base_url.is_empty() {
            return Err(SubmitError::EmptyBaseUrl);
        }
        if !path_info.starts_with('/') {
            return Err(SubmitError::InvalidPathInfo {
                path_info: path_info.to_string(),
            });
        }

        // Register as pending before checking the closed flag; `close` does
        // the mirror-image ordering, so a racing submission either observes
        // the closed flag or has already made the pending count nonzero.
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let pending = PendingGuard {
            inner: Arc::clone(&self.inner),
        };
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(SubmitError::Closed);
        }

        let context = RequestContext::new(&self.inner, base_url, path_info, query_string)?;

        debug!(path_info = %path_info, "request submitted");

        let completion = async move {
            let _pending = pending;

            // The await on the blocking task is the hand-off edge: every
            // worker-side write to the context happens-before this point.
            let outcome = tokio::task::spawn_blocking(move || worker::execute(context)).await;

            let (result, context) = match outcome {
                Ok(context) => (marshal::marshal(&context), Some(context)),
                Err(join_error) => (Err(GetError::Worker(join_error.to_string())), None),
            };

            // A callback that panics must not take the process down; report
            // it through the failure channel instead.
            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(move || callback(result)))
            {
                let message = panic_message(&panic);
                error!(panic = %message, "completion callback panicked");
            }

            // The request arena is destroyed only after the callback has
            // returned.
            drop(context);
        };

        // `spawn_local` panics when no LocalSet is driving this thread;
        // surface that as a submission error instead. The unwinding drop of
        // the completion future releases the context and the pending slot.
        std::panic::catch_unwind(AssertUnwindSafe(|| tokio::task::spawn_local(completion)))
            .map_err(|_| SubmitError::NoLocalContext)?;

        Ok(())
    }

    /// Close the handle, destroying the process-wide arena.
    ///
    /// Fails loudly if requests are still in flight: disposing the handle
    /// then would invalidate the configuration they are reading. Other
    /// clones of this handle observe the closed state and reject further
    /// submissions.
    pub fn close(self) -> Result<(), CloseError> {
        // Set the closed flag before reading the pending count, mirroring
        // the submission ordering: any request not yet counted here will
        // observe the flag and be rejected before it touches the arena.
        self.inner.closed.store(true, Ordering::SeqCst);
        let pending = self.inner.pending.load(Ordering::SeqCst);
        if pending > 0 {
            self.inner.closed.store(false, Ordering::SeqCst);
            return Err(CloseError::RequestsInFlight { pending });
        }

        self.inner.arena.release();
        info!(path = %self.inner.config.path().display(), "cache handle closed");
        Ok(())
    }
}

impl Cache {
    #[cfg(test)]
    pub(crate) fn inner_for_tests(&self) -> &Arc<CacheInner> {
        &self.inner
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
