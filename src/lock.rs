//! Cross-process mutual exclusion over a shared filesystem.
//!
//! The cache engine must serialize cache-miss regeneration across
//! independent OS processes sharing the same cache storage, so an in-process
//! mutex is not enough: the lock has to be visible at the filesystem level.
//! [`ProcessLock`] wraps a named lock file and an OS exclusive lock
//! (`fs2::FileExt::lock_exclusive`), which blocks the calling worker thread
//! until the lock is obtained.
//!
//! The handle enforces its own state machine: open/lock on `acquire`,
//! unlock/close on `release`. Acquiring a handle that is already held, or
//! releasing one that is not, is a programmer error and is reported through
//! [`LockError`] instead of silently corrupting the handle.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::LockError;

/// Default lock file shared by all cooperating processes.
pub const DEFAULT_LOCK_PATH: &str = "/tmp/tilebridge.lock";

/// A named, file-backed exclusive lock usable across OS processes.
///
/// Each in-flight request carries its own `ProcessLock` handle pointing at
/// the handle-wide lock path; exclusion between handles (and between
/// processes) is provided by the OS file lock, not by shared Rust state.
///
/// # Example
///
/// ```no_run
/// use tilebridge::lock::ProcessLock;
///
/// let mut lock = ProcessLock::new("/tmp/tilebridge.lock");
/// lock.acquire()?;
/// // ... regenerate the missing tile ...
/// lock.release()?;
/// # Ok::<(), tilebridge::error::LockError>(())
/// ```
#[derive(Debug)]
pub struct ProcessLock {
    path: PathBuf,
    file: Option<File>,
}

impl ProcessLock {
    /// Create an unheld lock handle for the given lock file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// The lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Create the lock file if absent and take the OS exclusive lock,
    /// blocking the calling thread until the lock is obtained.
    ///
    /// Calling `acquire` while this handle already holds the lock is a
    /// defect and returns [`LockError::AlreadyHeld`].
    pub fn acquire(&mut self) -> Result<(), LockError> {
        if self.file.is_some() {
            return Err(LockError::AlreadyHeld {
                path: self.path.clone(),
            });
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| LockError::Create {
                path: self.path.clone(),
                source,
            })?;

        file.lock_exclusive().map_err(|source| LockError::Lock {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), "acquired cross-process lock");
        self.file = Some(file);
        Ok(())
    }

    /// Unlock and close the lock file, clearing the handle.
    ///
    /// Calling `release` on a handle that does not hold the lock is a
    /// defect and returns [`LockError::NotHeld`].
    pub fn release(&mut self) -> Result<(), LockError> {
        let file = self.file.take().ok_or_else(|| LockError::NotHeld {
            path: self.path.clone(),
        })?;

        FileExt::unlock(&file).map_err(|source| LockError::Unlock {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), "released cross-process lock");
        // Dropping the file closes it.
        Ok(())
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        // A held lock is released by the OS when the file closes; dropping
        // without an explicit release is therefore safe, just unceremonious.
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
