//! The asynchronous dispatch bridge.
//!
//! This is the component that touches both sides of the thread boundary:
//! requests are admitted on the main thread, executed against the engine on
//! the blocking pool, and completed back on the main thread. The pieces:
//!
//! - [`Cache`]: the long-lived handle; [`Cache::open`] / [`Cache::get`] /
//!   [`Cache::close`].
//! - [`RequestContext`]: per-request inputs, arena, and response slot;
//!   moved across the thread boundary by value.
//! - [`CacheResult`]: the marshaled, boundary-visible result delivered to
//!   the completion callback.
//!
//! # Data flow
//!
//! ```text
//! main thread                     worker thread
//! ───────────                     ─────────────
//! get() validates args
//!   └─ RequestContext created
//!        └─ spawn_blocking ─────▶ parse params
//!                                 dispatch / classify
//!                                 engine operation
//!                                 response attached
//!        ◀───── JoinHandle await ─┘
//! marshal to CacheResult
//! callback(error | result)
//! context + arena released
//! ```

mod context;
mod handle;
mod marshal;
mod worker;

pub use context::RequestContext;
pub use handle::Cache;
pub use marshal::CacheResult;

// =============================================================================
// Test Support
// =============================================================================
