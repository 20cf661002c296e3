//! Scoped memory regions with bulk lifetime.
//!
//! An [`Arena`] groups allocations that share one lifetime: everything
//! allocated from an arena is released together, in one operation, when the
//! arena is released or dropped. Arenas form a tree. The process-wide arena
//! owned by a cache handle is the root; each request gets a child arena, so
//! releasing the root is guaranteed to release every outstanding request
//! arena, while releasing a child never affects its parent.
//!
//! Allocations copy the caller's data into arena-owned storage and hand back
//! cheap reference-counted views ([`Bytes`] / [`ArenaStr`]). Releasing the
//! arena drops its retained references in one pass; the backing memory is
//! returned once the last outstanding view goes away, so a release can never
//! invalidate data a consumer still holds.
//!
//! Reservation failures are reported as [`ArenaError::Exhausted`], never as
//! a silent null.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;

use crate::error::ArenaError;

/// A scoped allocation region with bulk release.
///
/// Cloning an `Arena` clones the handle, not the region: both handles refer
/// to the same allocations.
///
/// # Example
///
/// ```
/// use tilebridge::arena::Arena;
///
/// let root = Arena::new("process");
/// let request = root.child("request");
///
/// let path = request.alloc_str("/wms").unwrap();
/// assert_eq!(&*path, "/wms");
///
/// // Releasing the root releases every descendant as well.
/// root.release();
/// assert!(request.alloc_str("/tms").is_err());
/// ```
#[derive(Clone)]
pub struct Arena {
    inner: Arc<ArenaInner>,
}

struct ArenaInner {
    label: String,
    /// Allocations retained by this arena, dropped in bulk on release.
    slabs: Mutex<Vec<Bytes>>,
    /// Child arenas, held weakly: a child owned only by its user dies with
    /// that user, but a live child is still reachable for bulk release.
    children: Mutex<Vec<Weak<ArenaInner>>>,
    allocated: AtomicUsize,
    released: AtomicBool,
}

impl Arena {
    /// Create a new root arena.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ArenaInner {
                label: label.into(),
                slabs: Mutex::new(Vec::new()),
                children: Mutex::new(Vec::new()),
                allocated: AtomicUsize::new(0),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Create a child arena registered with this arena.
    ///
    /// Releasing this arena also releases the child; releasing the child
    /// leaves this arena untouched.
    pub fn child(&self, label: impl Into<String>) -> Arena {
        let child = Arena::new(label);
        if self.inner.released.load(Ordering::Acquire) {
            // A released parent cannot host live children.
            child.inner.released.store(true, Ordering::Release);
            return child;
        }
        let mut children = lock_poisoned_ok(&self.inner.children);
        // Drop dead registrations while we are here.
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(&child.inner));
        child
    }

    /// The label this arena was created with.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Copy `data` into arena-owned storage.
    ///
    /// The returned [`Bytes`] remains valid for as long as the caller holds
    /// it, but the arena drops its own reference on release.
    pub fn alloc_bytes(&self, data: &[u8]) -> Result<Bytes, ArenaError> {
        if self.inner.released.load(Ordering::Acquire) {
            return Err(ArenaError::Released {
                arena: self.inner.label.clone(),
            });
        }

        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(data.len())
            .map_err(|_| ArenaError::Exhausted {
                arena: self.inner.label.clone(),
                requested: data.len(),
            })?;
        buf.extend_from_slice(data);

        let bytes = Bytes::from(buf);
        lock_poisoned_ok(&self.inner.slabs).push(bytes.clone());
        self.inner.allocated.fetch_add(data.len(), Ordering::Relaxed);
        Ok(bytes)
    }

    /// Copy `s` into arena-owned storage, returning a string view.
    pub fn alloc_str(&self, s: &str) -> Result<ArenaStr, ArenaError> {
        Ok(ArenaStr {
            bytes: self.alloc_bytes(s.as_bytes())?,
        })
    }

    /// Total bytes currently retained by this arena (excluding descendants).
    pub fn allocated_bytes(&self) -> usize {
        self.inner.allocated.load(Ordering::Relaxed)
    }

    /// Whether this arena has been released.
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Release every allocation made from this arena and all descendant
    /// arenas.
    ///
    /// Further allocations on this arena or any descendant fail with
    /// [`ArenaError::Released`]. Releasing twice is a no-op.
    pub fn release(&self) {
        self.inner.release();
    }
}

impl ArenaInner {
    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        // Take the child list first so a child registering concurrently
        // cannot be missed after we clear our own slabs.
        let children = std::mem::take(&mut *lock_poisoned_ok(&self.children));
        for child in children {
            if let Some(child) = child.upgrade() {
                child.release();
            }
        }

        lock_poisoned_ok(&self.slabs).clear();
        self.allocated.store(0, Ordering::Relaxed);
    }
}

impl Drop for ArenaInner {
    fn drop(&mut self) {
        // Dropping the last handle behaves like an explicit release so that
        // a root arena going away always tears down its descendants.
        self.release();
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("label", &self.inner.label)
            .field("allocated", &self.allocated_bytes())
            .field("released", &self.is_released())
            .finish()
    }
}

/// A string allocated from an [`Arena`].
///
/// Dereferences to `str`. Clones are cheap and share the arena-owned
/// storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaStr {
    bytes: Bytes,
}

impl std::ops::Deref for ArenaStr {
    type Target = str;

    fn deref(&self) -> &str {
        // Only constructed in `alloc_str` from a `&str`, and the bytes are
        // never mutated afterwards, so the check cannot fail.
        std::str::from_utf8(&self.bytes).expect("arena string holds valid UTF-8")
    }
}

impl AsRef<str> for ArenaStr {
    fn as_ref(&self) -> &str {
        self
    }
}

impl std::fmt::Display for ArenaStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self)
    }
}

/// Recover the guard even if a panic poisoned the mutex; arena state stays
/// consistent because every mutation is a single push/clear.
fn lock_poisoned_ok<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// =============================================================================
// Tests
// =============================================================================
