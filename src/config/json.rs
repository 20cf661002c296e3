//! JSON-backed configuration loader.
//!
//! Parses a configuration document of the shape:
//!
//! ```json
//! {
//!   "services": ["wms", "wmts"],
//!   "sources": [{ "name": "osm", "url": "https://tile.example.org/{z}/{x}/{y}.png" }],
//!   "caches": [{ "name": "disk", "backend": "disk" }],
//!   "tilesets": [{ "name": "osm", "source": "osm", "cache": "disk" }],
//!   "lock_path": "/tmp/tilebridge.lock"
//! }
//! ```
//!
//! `post_configure` resolves the cross-references: every tileset must name
//! an existing source and an existing cache, and at least one service must
//! be enabled.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::arena::Arena;
use crate::error::ConfigError;

use super::{CacheEntry, ConfigLoader, ConfigTree, SourceEntry, TilesetEntry};

// =============================================================================
// Document Schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    services: Vec<String>,

    #[serde(default)]
    sources: Vec<SourceDocument>,

    #[serde(default)]
    caches: Vec<CacheDocument>,

    #[serde(default)]
    tilesets: Vec<TilesetDocument>,

    #[serde(default)]
    lock_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct SourceDocument {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct CacheDocument {
    name: String,
    backend: String,
}

#[derive(Debug, Deserialize)]
struct TilesetDocument {
    name: String,
    source: String,
    cache: String,
}

// =============================================================================
// Loader
// =============================================================================

/// [`ConfigLoader`] for JSON configuration files.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonConfigLoader;

impl JsonConfigLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigLoader for JsonConfigLoader {
    fn parse(&self, path: &Path, arena: &Arena) -> Result<ConfigTree, ConfigError> {
        let raw = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // Bind the raw document to the handle's arena so its memory is
        // accounted to, and released with, the owning handle.
        let raw = arena.alloc_bytes(&raw)?;

        let document: ConfigDocument =
            serde_json::from_slice(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        debug!(
            path = %path.display(),
            services = document.services.len(),
            tilesets = document.tilesets.len(),
            "parsed configuration"
        );

        let mut tree = ConfigTree::new(path);
        tree.set_services(document.services);
        tree.set_sources(
            document
                .sources
                .into_iter()
                .map(|s| SourceEntry {
                    name: s.name,
                    url: s.url,
                })
                .collect(),
        );
        tree.set_caches(
            document
                .caches
                .into_iter()
                .map(|c| CacheEntry {
                    name: c.name,
                    backend: c.backend,
                })
                .collect(),
        );
        tree.set_tilesets(
            document
                .tilesets
                .into_iter()
                .map(|t| TilesetEntry {
                    name: t.name,
                    source: t.source,
                    cache: t.cache,
                })
                .collect(),
        );
        tree.set_lock_path(document.lock_path);

        Ok(tree)
    }

    fn post_configure(&self, tree: &mut ConfigTree) -> Result<(), ConfigError> {
        let post_config_err = |message: String| ConfigError::PostConfig {
            path: tree.path().to_path_buf(),
            message,
        };

        if tree.services().is_empty() {
            return Err(post_config_err("no services enabled".to_string()));
        }

        for tileset in tree.tilesets() {
            if !tree.sources().iter().any(|s| s.name == tileset.source) {
                return Err(post_config_err(format!(
                    "tileset '{}' references unknown source '{}'",
                    tileset.name, tileset.source
                )));
            }
            if !tree.caches().iter().any(|c| c.name == tileset.cache) {
                return Err(post_config_err(format!(
                    "tileset '{}' references unknown cache '{}'",
                    tileset.name, tileset.cache
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
