//! Shared fixtures for integration tests.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;

use tilebridge::engine::{
    CacheEngine, CapabilitiesRequest, EngineRequest, FeatureInfoQuery, HttpResponse, MapRender,
    ParamTable, ProxyRequest, RequestScope, TileFetch,
};
use tilebridge::error::EngineError;
use tilebridge::{Cache, ConfigTree, JsonConfigLoader};

/// A PNG-ish tile payload with embedded zero bytes, for the byte-count
/// invariant tests.
pub const TILE_PAYLOAD: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x01, 0x00,
];

/// Write a valid configuration file and return its directory guard and path.
pub fn write_valid_config() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("regen.lock");
    let config = format!(
        r#"{{
            "services": ["wms", "wmts"],
            "sources": [{{ "name": "osm", "url": "https://tile.example.org/{{z}}/{{x}}/{{y}}.png" }}],
            "caches": [{{ "name": "disk", "backend": "disk" }}],
            "tilesets": [{{ "name": "osm", "source": "osm", "cache": "disk" }}],
            "lock_path": "{}"
        }}"#,
        lock_path.display()
    );

    let path = dir.path().join("tilebridge.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(config.as_bytes()).unwrap();
    (dir, path)
}

/// Open a cache handle over a fresh valid configuration and the mock engine.
pub fn open_test_cache(engine: MockEngine) -> (tempfile::TempDir, Cache) {
    let (dir, path) = write_valid_config();
    let cache = Cache::open(&path, &JsonConfigLoader::new(), Arc::new(engine)).unwrap();
    (dir, cache)
}

// =============================================================================
// Mock Engine
// =============================================================================

/// A mock tile-cache engine driven by the query string.
///
/// Classification mirrors OGC conventions: the `REQUEST` parameter selects
/// the operation, the path selects the service. Behaviors needed by the
/// tests are toggled per instance.
#[derive(Debug, Default)]
pub struct MockEngine {
    /// Sleep this long in `get_tile`, to exercise completion ordering.
    pub tile_delay: Option<Duration>,

    /// Fail every operation (not classification) with this status code.
    pub fail_operations_with: Option<u16>,

    /// Acquire and release the scope's cross-process lock in `get_tile`.
    pub lock_in_get_tile: bool,

    /// Acquire the scope's lock twice without releasing, to show misuse is
    /// reported and surfaces as an error-shaped response.
    pub double_acquire_lock: bool,

    /// Panic in `dispatch`, to exercise the worker-failure error slot.
    pub panic_in_dispatch: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn operation_failure(&self) -> Option<EngineError> {
        self.fail_operations_with.map(|code| EngineError::Operation {
            code,
            message: format!("mock operation failed with {code}"),
        })
    }
}

impl CacheEngine for MockEngine {
    fn dispatch(
        &self,
        path_info: &str,
        params: &ParamTable,
        config: &ConfigTree,
    ) -> Result<EngineRequest, EngineError> {
        if self.panic_in_dispatch {
            panic!("mock engine dispatch panicked");
        }

        let service = path_info.trim_start_matches('/').to_string();
        if !config.has_service(&service) {
            return Err(EngineError::Dispatch {
                path_info: path_info.to_string(),
                message: format!("no service registered at '{path_info}'"),
            });
        }

        match params.get("REQUEST") {
            Some("GetCapabilities") => Ok(EngineRequest::Capabilities(CapabilitiesRequest {
                service,
                version: params.get("VERSION").map(str::to_string),
            })),
            Some("GetTile") => Ok(EngineRequest::Tile(TileFetch {
                service,
                tileset: params.get("LAYER").unwrap_or("osm").to_string(),
                level: params.get("TILEMATRIX").and_then(|v| v.parse().ok()).unwrap_or(0),
                x: params.get("TILECOL").and_then(|v| v.parse().ok()).unwrap_or(0),
                y: params.get("TILEROW").and_then(|v| v.parse().ok()).unwrap_or(0),
            })),
            Some("GetMap") => Ok(EngineRequest::Map(MapRender {
                service,
                layers: params
                    .get("LAYERS")
                    .map(|l| l.split(',').map(str::to_string).collect())
                    .unwrap_or_default(),
                params: params.clone(),
            })),
            Some("GetFeatureInfo") => Ok(EngineRequest::FeatureInfo(FeatureInfoQuery {
                service,
                layers: params
                    .get("QUERY_LAYERS")
                    .map(|l| l.split(',').map(str::to_string).collect())
                    .unwrap_or_default(),
                params: params.clone(),
            })),
            Some("Proxy") => Ok(EngineRequest::Proxy(ProxyRequest {
                service,
                upstream: "https://upstream.example.org/".to_string(),
                params: params.clone(),
            })),
            other => Err(EngineError::Dispatch {
                path_info: path_info.to_string(),
                message: format!("unsupported request {other:?}"),
            }),
        }
    }

    fn get_capabilities(
        &self,
        _scope: &mut RequestScope<'_>,
        request: &CapabilitiesRequest,
        base_url: &str,
        path_info: &str,
    ) -> Result<HttpResponse, EngineError> {
        if let Some(err) = self.operation_failure() {
            return Err(err);
        }
        let document = format!(
            "<Capabilities service=\"{}\" href=\"{}{}\"/>",
            request.service,
            base_url.trim_end_matches('/'),
            path_info
        );
        Ok(HttpResponse::ok(Bytes::from(document))
            .with_header("content-type", "application/xml"))
    }

    fn get_tile(
        &self,
        scope: &mut RequestScope<'_>,
        request: &TileFetch,
    ) -> Result<HttpResponse, EngineError> {
        if let Some(delay) = self.tile_delay {
            std::thread::sleep(delay);
        }
        if let Some(err) = self.operation_failure() {
            return Err(err);
        }

        if self.double_acquire_lock {
            scope.lock.acquire().map_err(EngineError::from)?;
            // Second acquire on a held handle is a reported defect.
            let result = scope.lock.acquire().map_err(EngineError::from);
            let _ = scope.lock.release();
            result?;
        } else if self.lock_in_get_tile {
            // Serialize regeneration the way a real engine would on a miss.
            scope.lock.acquire().map_err(EngineError::from)?;
            scope.lock.release().map_err(EngineError::from)?;
        }

        if scope.config.tileset(&request.tileset).is_none() {
            return Err(EngineError::Operation {
                code: 404,
                message: format!("tileset '{}' not configured", request.tileset),
            });
        }

        Ok(HttpResponse::ok(Bytes::from_static(TILE_PAYLOAD))
            .with_mtime(SystemTime::now())
            .with_header("content-type", "image/png")
            .with_header("cache-control", "public")
            .with_header("cache-control", "max-age=3600"))
    }

    fn proxy(
        &self,
        _scope: &mut RequestScope<'_>,
        request: &ProxyRequest,
    ) -> Result<HttpResponse, EngineError> {
        if let Some(err) = self.operation_failure() {
            return Err(err);
        }
        Ok(HttpResponse::ok(Bytes::from(format!(
            "proxied to {}",
            request.upstream
        ))))
    }

    fn get_map(
        &self,
        _scope: &mut RequestScope<'_>,
        request: &MapRender,
    ) -> Result<HttpResponse, EngineError> {
        if let Some(err) = self.operation_failure() {
            return Err(err);
        }
        Ok(HttpResponse::ok(Bytes::from(format!(
            "map of {} layer(s)",
            request.layers.len()
        )))
        .with_header("content-type", "image/png"))
    }

    fn get_feature_info(
        &self,
        _scope: &mut RequestScope<'_>,
        request: &FeatureInfoQuery,
    ) -> Result<HttpResponse, EngineError> {
        if let Some(err) = self.operation_failure() {
            return Err(err);
        }
        Ok(HttpResponse::ok(Bytes::from(format!(
            "features in {} layer(s)",
            request.layers.len()
        )))
        .with_header("content-type", "application/json"))
    }

    fn error_response(&self, service: Option<&str>, diagnostic: Option<&str>) -> HttpResponse {
        let code = if service.is_none() { 404 } else { 500 };
        HttpResponse::error(code, diagnostic.unwrap_or("mock error"))
    }
}
