//! Worker-side execution of a submitted request.
//!
//! Runs entirely off the main thread on the blocking pool. Consumes the
//! engine collaborator, never reimplements it: parse the query string,
//! classify the request, route it to the matching engine operation, and on
//! any failure substitute a generated error response. Every path ends with
//! exactly one response model attached to the context.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::EngineRequest;

use super::context::RequestContext;

/// Execute one request against the engine.
///
/// Takes ownership of the context and hands it back with a response
/// attached; the caller re-enters the main thread with the returned value.
pub(crate) fn execute(mut context: RequestContext) -> RequestContext {
    let engine = Arc::clone(&context.handle.engine);
    // Cheap arena-backed clones; the originals stay on the context.
    let base_url = context.base_url.clone();
    let path_info = context.path_info.clone();
    let query_string = context.query_string.clone();

    let params = engine.parse_params(&query_string);
    debug!(path_info = %path_info, params = params.len(), "classifying request");

    let response = match engine.dispatch(&path_info, &params, &context.handle.config) {
        Err(err) => {
            let diagnostic = err.to_string();
            warn!(path_info = %path_info, error = %diagnostic, "request classification failed");
            context.diagnostic = Some(diagnostic.clone());
            engine.error_response(None, Some(&diagnostic))
        }
        Ok(request) => {
            let service = request.service().to_string();
            debug!(kind = request.kind(), service = %service, "executing engine operation");

            let outcome = {
                let mut scope = context.scope();
                match &request {
                    EngineRequest::Capabilities(r) => {
                        engine.get_capabilities(&mut scope, r, &base_url, &path_info)
                    }
                    EngineRequest::Tile(r) => engine.get_tile(&mut scope, r),
                    EngineRequest::Proxy(r) => engine.proxy(&mut scope, r),
                    EngineRequest::Map(r) => engine.get_map(&mut scope, r),
                    EngineRequest::FeatureInfo(r) => engine.get_feature_info(&mut scope, r),
                }
            };

            match outcome {
                Ok(response) => response,
                Err(err) => {
                    let diagnostic = err.to_string();
                    warn!(
                        kind = request.kind(),
                        service = %service,
                        error = %diagnostic,
                        "engine operation failed"
                    );
                    context.diagnostic = Some(diagnostic.clone());
                    engine.error_response(Some(&service), Some(&diagnostic))
                }
            }
        }
    };

    context.response = Some(response);
    context
}
