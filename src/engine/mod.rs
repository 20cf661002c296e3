//! Engine collaborator seam.
//!
//! The dispatch bridge consumes the tile-cache engine, it does not
//! reimplement it. The engine is anything implementing [`CacheEngine`]:
//! classify a request against the configuration, then execute the matching
//! operation (capabilities listing, tile fetch, proxy passthrough, map
//! render, feature-info query) producing exactly one [`HttpResponse`].
//!
//! The five request kinds are a closed sum type, [`EngineRequest`], so the
//! worker's routing match is exhaustive at compile time: there is no
//! runtime "unknown request type" path.

pub mod params;
pub mod response;

pub use params::ParamTable;
pub use response::HttpResponse;

use crate::arena::Arena;
use crate::config::ConfigTree;
use crate::error::EngineError;
use crate::lock::ProcessLock;

// =============================================================================
// Request Kinds
// =============================================================================

/// A capabilities-document request.
#[derive(Debug, Clone)]
pub struct CapabilitiesRequest {
    /// Service that will answer (e.g. "wms").
    pub service: String,

    /// Protocol version requested by the client, if any.
    pub version: Option<String>,
}

/// A single-tile fetch.
#[derive(Debug, Clone)]
pub struct TileFetch {
    pub service: String,

    /// Tileset the tile belongs to.
    pub tileset: String,

    /// Zoom / grid level.
    pub level: u32,

    pub x: u32,
    pub y: u32,
}

/// A passthrough to the tileset's upstream source.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub service: String,

    /// Upstream URL the request is forwarded to.
    pub upstream: String,

    /// Parameters forwarded with the request.
    pub params: ParamTable,
}

/// An untiled map render assembled from cached tiles.
#[derive(Debug, Clone)]
pub struct MapRender {
    pub service: String,

    /// Layers to composite, in draw order.
    pub layers: Vec<String>,

    pub params: ParamTable,
}

/// A feature-info query at a pixel position.
#[derive(Debug, Clone)]
pub struct FeatureInfoQuery {
    pub service: String,

    pub layers: Vec<String>,

    pub params: ParamTable,
}

/// A classified request, one variant per engine operation.
///
/// Closed by design: adding a kind is a compile-time event for every
/// consumer, not a runtime error message.
#[derive(Debug, Clone)]
pub enum EngineRequest {
    Capabilities(CapabilitiesRequest),
    Tile(TileFetch),
    Proxy(ProxyRequest),
    Map(MapRender),
    FeatureInfo(FeatureInfoQuery),
}

impl EngineRequest {
    /// The service that classified this request.
    pub fn service(&self) -> &str {
        match self {
            EngineRequest::Capabilities(r) => &r.service,
            EngineRequest::Tile(r) => &r.service,
            EngineRequest::Proxy(r) => &r.service,
            EngineRequest::Map(r) => &r.service,
            EngineRequest::FeatureInfo(r) => &r.service,
        }
    }

    /// Short name of the request kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineRequest::Capabilities(_) => "capabilities",
            EngineRequest::Tile(_) => "tile",
            EngineRequest::Proxy(_) => "proxy",
            EngineRequest::Map(_) => "map",
            EngineRequest::FeatureInfo(_) => "feature-info",
        }
    }
}

// =============================================================================
// Request Scope
// =============================================================================

/// Per-request resources handed to engine operations.
///
/// Everything here is exclusively owned by the executing request: the arena
/// for scratch allocations, the read-only configuration tree, and the
/// request's cross-process lock handle for serializing cache-miss
/// regeneration. Nothing in the scope is shared with the main thread while
/// the operation runs.
pub struct RequestScope<'a> {
    /// The request's private arena.
    pub arena: &'a Arena,

    /// The owning handle's configuration, read-only.
    pub config: &'a ConfigTree,

    /// Cross-process lock handle for cache regeneration.
    pub lock: &'a mut ProcessLock,
}

// =============================================================================
// CacheEngine Trait
// =============================================================================

/// The tile-cache engine consumed by the dispatch bridge.
///
/// All methods run on a worker thread and may block (storage I/O, upstream
/// fetches, image work). Implementations must be shareable across
/// concurrently executing requests; per-request state lives in the
/// [`RequestScope`], never in the engine.
///
/// Business failures are returned as [`EngineError`] and converted by the
/// bridge into an error-shaped response via [`error_response`]; they are
/// never raised to the caller's error slot.
///
/// [`error_response`]: CacheEngine::error_response
pub trait CacheEngine: Send + Sync + 'static {
    /// Parse a query string into a parameter table.
    ///
    /// The default implementation handles standard URL encoding; engines
    /// with unusual grammars may override it.
    fn parse_params(&self, query_string: &str) -> ParamTable {
        ParamTable::parse(query_string)
    }

    /// Classify a request against the configuration.
    fn dispatch(
        &self,
        path_info: &str,
        params: &ParamTable,
        config: &ConfigTree,
    ) -> Result<EngineRequest, EngineError>;

    /// Produce the capabilities document for a service.
    fn get_capabilities(
        &self,
        scope: &mut RequestScope<'_>,
        request: &CapabilitiesRequest,
        base_url: &str,
        path_info: &str,
    ) -> Result<HttpResponse, EngineError>;

    /// Fetch one tile, regenerating it on a cache miss.
    fn get_tile(
        &self,
        scope: &mut RequestScope<'_>,
        request: &TileFetch,
    ) -> Result<HttpResponse, EngineError>;

    /// Forward the request to the tileset's upstream source.
    fn proxy(
        &self,
        scope: &mut RequestScope<'_>,
        request: &ProxyRequest,
    ) -> Result<HttpResponse, EngineError>;

    /// Render an untiled map from cached tiles.
    fn get_map(
        &self,
        scope: &mut RequestScope<'_>,
        request: &MapRender,
    ) -> Result<HttpResponse, EngineError>;

    /// Answer a feature-info query.
    fn get_feature_info(
        &self,
        scope: &mut RequestScope<'_>,
        request: &FeatureInfoQuery,
    ) -> Result<HttpResponse, EngineError>;

    /// Generate an error response when a request cannot otherwise be
    /// satisfied.
    ///
    /// `service` is the classifying service when classification succeeded;
    /// `diagnostic` is the failure description, when one exists. The default
    /// produces a plain-text response so every failure path still yields a
    /// well-formed response model.
    fn error_response(&self, service: Option<&str>, diagnostic: Option<&str>) -> HttpResponse {
        let _ = service;
        let message = diagnostic.unwrap_or("internal error");
        HttpResponse::error(500, message)
    }
}

// =============================================================================
// Tests
// =============================================================================
