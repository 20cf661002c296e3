use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the arena allocator.
#[derive(Debug, Clone, Error)]
pub enum ArenaError {
    /// Backing memory could not be reserved for an allocation.
    #[error("arena '{arena}' failed to reserve {requested} bytes")]
    Exhausted { arena: String, requested: usize },

    /// An allocation was attempted on an arena that has already been released.
    #[error("arena '{arena}' has been released")]
    Released { arena: String },
}

/// Errors raised by the cross-process lock.
///
/// Misuse of the lock handle (double acquire, release without a prior
/// acquire) is reported as an error rather than silently corrupting the
/// handle state.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock file could not be created or opened.
    #[error("failed to create lock file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The OS-level exclusive lock could not be taken.
    #[error("failed to lock file {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The OS-level lock could not be dropped.
    #[error("failed to unlock file {path}: {source}")]
    Unlock {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `acquire` was called on a handle that already holds the lock.
    #[error("lock {path} is already held by this handle")]
    AlreadyHeld { path: PathBuf },

    /// `release` was called on a handle that does not hold the lock.
    #[error("lock {path} is not held by this handle")]
    NotHeld { path: PathBuf },
}

/// Errors raised while loading or validating a configuration file.
///
/// Every variant carries the configuration path so failure messages always
/// point at the offending file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The post-parse validation/linking pass failed.
    #[error("post-configuration failed for {path}: {message}")]
    PostConfig { path: PathBuf, message: String },

    /// Arena reservation failed while binding the configuration.
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Errors reported by the engine collaborator during worker-side execution.
///
/// These never reach the caller's error slot directly: the dispatch bridge
/// converts them into an error-shaped response via
/// [`CacheEngine::error_response`](crate::engine::CacheEngine::error_response).
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The request could not be classified against the configuration.
    #[error("no service could handle request for '{path_info}': {message}")]
    Dispatch { path_info: String, message: String },

    /// A per-request-type operation failed with an HTTP-like status.
    #[error("{message}")]
    Operation { code: u16, message: String },

    /// The cross-process lock failed during cache regeneration.
    #[error("lock failure during cache regeneration: {0}")]
    Lock(String),
}

impl EngineError {
    /// HTTP-like status code for the generated error response.
    pub fn code(&self) -> u16 {
        match self {
            EngineError::Dispatch { .. } => 404,
            EngineError::Operation { code, .. } => *code,
            EngineError::Lock(_) => 500,
        }
    }
}

impl From<LockError> for EngineError {
    fn from(err: LockError) -> Self {
        EngineError::Lock(err.to_string())
    }
}

/// Errors raised by [`Cache::open`](crate::bridge::Cache::open).
#[derive(Debug, Error)]
pub enum OpenError {
    /// Parsing or post-configuration failed; the message includes the
    /// configuration path and the underlying diagnostic.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by [`Cache::close`](crate::bridge::Cache::close).
#[derive(Debug, Error)]
pub enum CloseError {
    /// Requests are still in flight; disposing the handle now would
    /// invalidate their configuration reference.
    #[error("cannot close cache handle: {pending} request(s) still in flight")]
    RequestsInFlight { pending: usize },
}

/// Synchronous submission errors, reported before any worker is involved.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The handle has already been closed.
    #[error("cache handle is closed")]
    Closed,

    /// The submitting thread is not driving a local task set, so the
    /// completion callback would have nowhere to run.
    #[error("request submission requires a local task context")]
    NoLocalContext,

    /// The base URL argument was empty.
    #[error("base URL must not be empty")]
    EmptyBaseUrl,

    /// The path info argument did not name a resource.
    #[error("path info '{path_info}' must begin with '/'")]
    InvalidPathInfo { path_info: String },

    /// The per-request arena could not be set up.
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Asynchronous failures delivered through the completion callback's error
/// slot.
///
/// Engine/business failures are *not* represented here: those arrive in the
/// success slot as an error-shaped [`CacheResult`](crate::bridge::CacheResult)
/// with an appropriate status code.
#[derive(Debug, Error)]
pub enum GetError {
    /// Worker execution finished without attaching a response. Treated as an
    /// internal defect, not a user error.
    #[error("no response was received from the cache")]
    MissingResponse,

    /// The worker task itself failed to run to completion.
    #[error("worker execution failed: {0}")]
    Worker(String),
}
