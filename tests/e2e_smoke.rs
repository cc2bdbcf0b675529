// tests/e2e_smoke.rs
//
// Full app() wiring: config from env, file-backed cache in a temp dir,
// AI in mock mode, /metrics enabled.

use axum::body::{self, Body};
use http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

fn set_env(cache_dir: &std::path::Path) {
    std::env::remove_var("LEAFCART_CONFIG_PATH");
    std::env::set_var("LEAFCART_CACHE_DIR", cache_dir);
    std::env::set_var("LEAFCART_CACHE_TTL_MS", "60000");
    std::env::set_var("LEAFCART_METRICS", "1");
    std::env::set_var("AI_TEST_MODE", "mock");
}

async fn build_app() -> Router {
    leafcart::app().await.expect("app() should build Router in tests")
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let resp = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let cache = resp
        .headers()
        .get("x-score-cache")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = body::to_bytes(resp.into_body(), 4 * 1_048_576).await.unwrap();
    (status, cache, String::from_utf8(bytes.to_vec()).unwrap())
}

#[serial_test::serial]
#[tokio::test]
async fn app_serves_scores_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    set_env(dir.path());
    let app = build_app().await;

    let (status, _, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    let (_, cache, _) = get(&app, "/scores").await;
    assert_eq!(cache.as_deref(), Some("MISS"));
    let (_, cache, _) = get(&app, "/scores").await;
    assert_eq!(cache.as_deref(), Some("HIT"));
    assert!(dir.path().join("leafcart_scored_transactions.json").exists());

    let (status, _, metrics) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(metrics.contains("leafcart_score_cache_hits_total"), "{metrics}");
    assert!(metrics.contains("leafcart_score_cache_misses_total"));
    assert!(metrics.contains("leafcart_score_cache_ttl_ms 60000"));
}

#[serial_test::serial]
#[tokio::test]
async fn second_app_reuses_file_cache() {
    let dir = tempfile::tempdir().unwrap();
    set_env(dir.path());

    let (_, cache, first) = get(&build_app().await, "/scores").await;
    assert_eq!(cache.as_deref(), Some("MISS"));

    // a fresh router over the same cache dir behaves like a restart
    let (_, cache, second) = get(&build_app().await, "/scores").await;
    assert_eq!(cache.as_deref(), Some("HIT"));
    assert_eq!(first, second);
}
