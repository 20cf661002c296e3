//! Configuration collaborator seam.
//!
//! The dispatch bridge does not interpret the configuration grammar. It only
//! needs two entry points, [`ConfigLoader::parse`] and
//! [`ConfigLoader::post_configure`], and a way to read the resulting
//! [`ConfigTree`]. The tree is read-only once a cache handle has been
//! opened and may be read concurrently by any number of in-flight worker
//! executions without locking.
//!
//! A concrete JSON-backed loader is provided in [`json`]; alternative
//! grammars plug in by implementing [`ConfigLoader`].

pub mod json;

use std::path::{Path, PathBuf};

use crate::arena::Arena;
use crate::error::ConfigError;

pub use json::JsonConfigLoader;

// =============================================================================
// Configuration Tree
// =============================================================================

/// A named tile source (where cache misses are fetched from).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Source name, referenced by tilesets.
    pub name: String,

    /// Upstream URL template for this source.
    pub url: String,
}

/// A named cache backend (where tiles are stored).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Cache name, referenced by tilesets.
    pub name: String,

    /// Backend identifier (e.g. "disk", "sqlite", "memcache").
    pub backend: String,
}

/// A tileset binding a source to a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetEntry {
    /// Tileset name as exposed to services.
    pub name: String,

    /// Name of the [`SourceEntry`] misses are fetched from.
    pub source: String,

    /// Name of the [`CacheEntry`] tiles are stored in.
    pub cache: String,
}

/// The parsed, linked configuration for one cache handle.
///
/// Built by a [`ConfigLoader`]; immutable after
/// [`post_configure`](ConfigLoader::post_configure) has run.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    path: PathBuf,
    services: Vec<String>,
    sources: Vec<SourceEntry>,
    caches: Vec<CacheEntry>,
    tilesets: Vec<TilesetEntry>,
    lock_path: Option<PathBuf>,
}

impl ConfigTree {
    /// Create a tree for the given configuration path.
    ///
    /// Intended for loaders and tests; bridge consumers receive a tree from
    /// [`ConfigLoader::parse`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            services: Vec::new(),
            sources: Vec::new(),
            caches: Vec::new(),
            tilesets: Vec::new(),
            lock_path: None,
        }
    }

    /// The configuration file this tree was parsed from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Service endpoints enabled in this configuration (e.g. "wms", "wmts").
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Whether the named service endpoint is enabled.
    pub fn has_service(&self, name: &str) -> bool {
        self.services.iter().any(|s| s.eq_ignore_ascii_case(name))
    }

    pub fn sources(&self) -> &[SourceEntry] {
        &self.sources
    }

    pub fn caches(&self) -> &[CacheEntry] {
        &self.caches
    }

    pub fn tilesets(&self) -> &[TilesetEntry] {
        &self.tilesets
    }

    /// Look up a tileset by name.
    pub fn tileset(&self, name: &str) -> Option<&TilesetEntry> {
        self.tilesets.iter().find(|t| t.name == name)
    }

    /// Lock file path override, if the configuration sets one.
    pub fn lock_path(&self) -> Option<&Path> {
        self.lock_path.as_deref()
    }

    pub fn set_services(&mut self, services: Vec<String>) {
        self.services = services;
    }

    pub fn set_sources(&mut self, sources: Vec<SourceEntry>) {
        self.sources = sources;
    }

    pub fn set_caches(&mut self, caches: Vec<CacheEntry>) {
        self.caches = caches;
    }

    pub fn set_tilesets(&mut self, tilesets: Vec<TilesetEntry>) {
        self.tilesets = tilesets;
    }

    pub fn set_lock_path(&mut self, lock_path: Option<PathBuf>) {
        self.lock_path = lock_path;
    }
}

// =============================================================================
// ConfigLoader Trait
// =============================================================================

/// Loader for one configuration grammar.
///
/// Implementations parse a file into a [`ConfigTree`] and then run a
/// post-parse validation/linking pass resolving cross-references inside the
/// tree (tilesets naming their sources and caches). Both steps can fail
/// independently and must surface the underlying diagnostic together with
/// the configuration path.
pub trait ConfigLoader: Send + Sync {
    /// Parse the configuration file at `path` into a tree.
    ///
    /// The `arena` is the owning handle's process-wide arena; loaders bind
    /// bulk data (such as the raw file contents) to it so the configuration's
    /// memory is released with the handle.
    fn parse(&self, path: &Path, arena: &Arena) -> Result<ConfigTree, ConfigError>;

    /// Validate and link the parsed tree.
    ///
    /// Runs once, after `parse` and before the tree becomes visible to any
    /// worker execution.
    fn post_configure(&self, tree: &mut ConfigTree) -> Result<(), ConfigError>;
}

// =============================================================================
// Tests
// =============================================================================
