//! Integration Tests for the HTTP Fetcher
//!
//! Runs a local axum upstream and drives ReqwestFetcher and the engine
//! against it over real sockets.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{http::HeaderMap, http::StatusCode, routing::get, Json, Router};
use cachify::models::CachifyOptions;
use cachify::{
    CacheEngine, CacheError, FetchRequest, Fetcher, Lookup, MemoryStore, ReqwestFetcher,
};
use serde_json::json;

// == Helper Functions ==

/// Serves the test routes on an ephemeral port. Returns the base URL and the
/// hit counter of `/counter`.
async fn spawn_upstream() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new()
        .route("/json", get(|| async { Json(json!({"users": ["ada", "linus"]})) }))
        .route("/text", get(|| async { "plain body" }))
        .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
        .route("/null", get(|| async { "null" }))
        .route(
            "/error",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/echo",
            get(|headers: HeaderMap| async move {
                let token = headers
                    .get("x-token")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Json(json!({ "token": token }))
            }),
        )
        .route(
            "/counter",
            get(move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Json(json!({ "n": n }))
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), hits)
}

// == Fetcher Tests ==

#[tokio::test]
async fn test_fetch_json_body() {
    let (base, _hits) = spawn_upstream().await;
    let fetcher = ReqwestFetcher::new();

    let body = fetcher
        .fetch(&FetchRequest::get(format!("{}/json", base)))
        .await
        .unwrap();

    assert_eq!(body, Some(json!({"users": ["ada", "linus"]})));
}

#[tokio::test]
async fn test_fetch_text_body() {
    let (base, _hits) = spawn_upstream().await;
    let fetcher = ReqwestFetcher::new();

    let body = fetcher
        .fetch(&FetchRequest::get(format!("{}/text", base)))
        .await
        .unwrap();

    assert_eq!(body, Some(json!("plain body")));
}

#[tokio::test]
async fn test_fetch_empty_and_null_bodies() {
    let (base, _hits) = spawn_upstream().await;
    let fetcher = ReqwestFetcher::new();

    let empty = fetcher
        .fetch(&FetchRequest::get(format!("{}/empty", base)))
        .await
        .unwrap();
    let null = fetcher
        .fetch(&FetchRequest::get(format!("{}/null", base)))
        .await
        .unwrap();

    assert!(empty.is_none());
    assert!(null.is_none());
}

#[tokio::test]
async fn test_fetch_error_status() {
    let (base, _hits) = spawn_upstream().await;
    let fetcher = ReqwestFetcher::new();

    let result = fetcher
        .fetch(&FetchRequest::get(format!("{}/error", base)))
        .await;

    match result {
        Err(CacheError::Fetch(message)) => assert!(message.contains("500")),
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_sends_headers() {
    let (base, _hits) = spawn_upstream().await;
    let fetcher = ReqwestFetcher::new();

    let request = FetchRequest::get(format!("{}/echo", base)).header("x-token", "abc");
    let body = fetcher.fetch(&request).await.unwrap();

    assert_eq!(body, Some(json!({"token": "abc"})));
}

#[tokio::test]
async fn test_fetch_unreachable_upstream() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = ReqwestFetcher::new();
    let result = fetcher
        .fetch(&FetchRequest::get(format!("http://{}/", addr)))
        .await;

    assert!(matches!(result, Err(CacheError::Fetch(_))));
}

// == Engine Over HTTP ==

#[tokio::test]
async fn test_engine_caches_upstream_response() {
    let (base, hits) = spawn_upstream().await;
    let engine = CacheEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ReqwestFetcher::new()),
    );
    let request = FetchRequest::get(format!("{}/counter", base));

    let first = engine
        .cachify(request.clone(), CachifyOptions::new("counter"))
        .await
        .unwrap();
    let second = engine
        .cachify(request.clone(), CachifyOptions::new("counter"))
        .await
        .unwrap();

    assert_eq!(first, Some(Lookup::Found(json!({"n": 1}))));
    assert_eq!(second, first);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let forced = engine
        .cachify(request, CachifyOptions::new("counter").pre_sync(true))
        .await
        .unwrap();
    assert_eq!(forced, Some(Lookup::Found(json!({"n": 2}))));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_engine_empty_upstream_body() {
    let (base, _hits) = spawn_upstream().await;
    let engine = CacheEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ReqwestFetcher::new()),
    );

    let result = engine
        .cachify(
            FetchRequest::get(format!("{}/empty", base)),
            CachifyOptions::new("empty"),
        )
        .await;

    assert!(matches!(result, Err(CacheError::EmptyResponse(_))));
}
