//! # tilebridge
//!
//! An asynchronous dispatch bridge exposing a tile/map caching engine to a
//! single-threaded host runtime. Requests are accepted on the runtime's
//! main thread, the (potentially slow, I/O-bound) cache lookup or
//! regeneration runs on a background worker, and the result is delivered
//! back to the main thread through a completion callback; the main thread
//! never blocks on a request.
//!
//! The tile-cache business logic itself is an external collaborator behind
//! the [`engine::CacheEngine`] trait, as is the configuration grammar
//! behind [`config::ConfigLoader`]. This crate owns the seams between them:
//! request admission, per-request arena scoping, cross-thread hand-off,
//! result marshaling, and the cross-process lock the engine uses to
//! serialize cache-miss regeneration.
//!
//! ## Architecture
//!
//! - [`arena`] - Scoped memory regions with bulk release, arranged as a tree
//! - [`lock`] - Named, file-backed exclusive lock shared across OS processes
//! - [`config`] - Configuration loader seam and the parsed tree
//! - [`engine`] - Engine collaborator traits, request kinds, response model
//! - [`bridge`] - Cache handle, request context, dispatch, marshaling
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tilebridge::{Cache, JsonConfigLoader};
//! # use tilebridge::engine::CacheEngine;
//! # fn make_engine() -> Arc<dyn CacheEngine> { unimplemented!() }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let local = tokio::task::LocalSet::new();
//!     local
//!         .run_until(async {
//!             let engine = make_engine();
//!             let cache = Cache::open("/etc/tilebridge.json", &JsonConfigLoader::new(), engine)
//!                 .expect("configuration must load");
//!
//!             cache
//!                 .get(
//!                     "http://tiles.example.org/",
//!                     "/wms",
//!                     "SERVICE=WMS&REQUEST=GetCapabilities",
//!                     |result| match result {
//!                         Ok(result) => println!("code {}", result.code),
//!                         Err(err) => eprintln!("dispatch failed: {err}"),
//!                     },
//!                 )
//!                 .expect("arguments are valid");
//!         })
//!         .await;
//! }
//! ```

pub mod arena;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod lock;

// Re-export commonly used types
pub use arena::{Arena, ArenaStr};
pub use bridge::{Cache, CacheResult, RequestContext};
pub use config::{CacheEntry, ConfigLoader, ConfigTree, JsonConfigLoader, SourceEntry, TilesetEntry};
pub use engine::{
    CacheEngine, CapabilitiesRequest, EngineRequest, FeatureInfoQuery, HttpResponse, MapRender,
    ParamTable, ProxyRequest, RequestScope, TileFetch,
};
pub use error::{
    ArenaError, CloseError, ConfigError, EngineError, GetError, LockError, OpenError, SubmitError,
};
pub use lock::{ProcessLock, DEFAULT_LOCK_PATH};
