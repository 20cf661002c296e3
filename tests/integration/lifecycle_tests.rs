//! Cache handle lifecycle tests: open failures, close preconditions, and
//! arena teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::LocalSet;

use tilebridge::error::{CloseError, SubmitError};
use tilebridge::{Cache, JsonConfigLoader};

use super::test_utils::{open_test_cache, write_valid_config, MockEngine};

#[tokio::test]
async fn test_open_with_missing_config_names_the_path() {
    let err = Cache::open(
        "/no/such/tilebridge.json",
        &JsonConfigLoader::new(),
        Arc::new(MockEngine::new()),
    )
    .unwrap_err();

    assert!(err.to_string().contains("/no/such/tilebridge.json"));
}

#[tokio::test]
async fn test_open_surfaces_post_configuration_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{
            "services": ["wms"],
            "sources": [],
            "caches": [],
            "tilesets": [{ "name": "osm", "source": "ghost", "cache": "disk" }]
        }"#,
    )
    .unwrap();

    let err = Cache::open(&path, &JsonConfigLoader::new(), Arc::new(MockEngine::new()))
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("bad.json"));
    assert!(message.contains("ghost"));
}

#[tokio::test]
async fn test_open_reads_lock_path_from_config() {
    let (_dir, path) = write_valid_config();
    let cache = Cache::open(&path, &JsonConfigLoader::new(), Arc::new(MockEngine::new())).unwrap();

    assert!(cache
        .lock_path()
        .to_string_lossy()
        .ends_with("regen.lock"));
    cache.close().unwrap();
}

#[tokio::test]
async fn test_close_with_requests_in_flight_fails_loudly() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let engine = MockEngine {
                tile_delay: Some(Duration::from_millis(150)),
                ..MockEngine::new()
            };
            let (_dir, cache) = open_test_cache(engine);

            let (tx, rx) = tokio::sync::oneshot::channel();
            cache
                .get("http://x/", "/wmts", "REQUEST=GetTile", move |result| {
                    let _ = tx.send(result);
                })
                .unwrap();

            let err = cache.clone().close().unwrap_err();
            assert!(matches!(
                err,
                CloseError::RequestsInFlight { pending: 1 }
            ));

            // The failed close leaves the handle open: new submissions are
            // still accepted.
            let (tx2, rx2) = tokio::sync::oneshot::channel();
            cache
                .get("http://x/", "/wms", "REQUEST=GetCapabilities", move |result| {
                    let _ = tx2.send(result);
                })
                .unwrap();
            rx2.await.unwrap().unwrap();

            // After the requests drain, close succeeds.
            rx.await.unwrap().unwrap();
            cache.close().unwrap();
        })
        .await;
}

#[tokio::test]
async fn test_submissions_after_close_are_rejected() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (_dir, cache) = open_test_cache(MockEngine::new());
            let clone = cache.clone();
            cache.close().unwrap();

            let err = clone
                .get("http://x/", "/wms", "REQUEST=GetCapabilities", |_| {})
                .unwrap_err();
            assert!(matches!(err, SubmitError::Closed));
        })
        .await;
}

#[tokio::test]
async fn test_submission_outside_local_task_context_is_rejected() {
    // No LocalSet is driving this runtime, so there is nowhere for the
    // completion callback to run; the submission must fail synchronously
    // rather than abort the thread.
    let (_dir, cache) = open_test_cache(MockEngine::new());

    let err = cache
        .get("http://x/", "/wms", "REQUEST=GetCapabilities", |_| {})
        .unwrap_err();
    assert!(matches!(err, SubmitError::NoLocalContext));

    // The rejected submission left nothing behind.
    assert_eq!(cache.pending_requests(), 0);
    cache.close().unwrap();
}

#[tokio::test]
async fn test_handle_survives_dropping_caller_clone_mid_request() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let engine = MockEngine {
                tile_delay: Some(Duration::from_millis(50)),
                ..MockEngine::new()
            };
            let (_dir, cache) = open_test_cache(engine);

            let (tx, rx) = tokio::sync::oneshot::channel();
            cache
                .get("http://x/", "/wmts", "REQUEST=GetTile", move |result| {
                    let _ = tx.send(result);
                })
                .unwrap();

            // The in-flight request keeps the shared state alive.
            drop(cache);

            let result = rx.await.unwrap().unwrap();
            assert_eq!(result.code, 200);
        })
        .await;
}

#[tokio::test]
async fn test_close_releases_process_arena() {
    let (_dir, path) = write_valid_config();
    let cache = Cache::open(&path, &JsonConfigLoader::new(), Arc::new(MockEngine::new())).unwrap();

    // The configuration document is bound to the process-wide arena.
    assert!(cache.allocated_bytes() > 0);

    let observer = cache.clone();
    cache.close().unwrap();
    assert_eq!(observer.allocated_bytes(), 0);
}
