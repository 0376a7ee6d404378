//! Integration tests for ktv-search HTTP endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Aggregated search via GET query and POST body
//! - Input validation (blank keyword, unknown search type)
//! - Catalog passthrough truncation and upstream error mapping

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use helpers::{fast_settings, FailingSource, ScriptedSource};
use ktv_common::config::CATCH_ALL_COMPANY;
use ktv_common::RawSongRecord;
use ktv_search::search::SearchEngine;
use ktv_search::services::{CatalogError, CatalogSource};
use ktv_search::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: router over an in-memory catalog
fn setup_app(source: Arc<dyn CatalogSource>, companies: &[&str]) -> axum::Router {
    let engine = SearchEngine::new(source, fast_settings(companies));
    build_router(AppState::new(Arc::new(engine)))
}

fn love_story_source() -> Arc<ScriptedSource> {
    Arc::new(
        ScriptedSource::new()
            .with_records("A", vec![RawSongRecord::new("愛情故事", "S1", "A1", "A")])
            .with_records(
                "B",
                vec![
                    RawSongRecord::new("愛情故事", "S1", "B2", "B").with_lang("國語"),
                    RawSongRecord::new("快樂", "S2", "B9", "B"),
                ],
            ),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(Arc::new(ScriptedSource::new()), &["A"]);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "ktv-search");
}

// =============================================================================
// Aggregated search
// =============================================================================

#[tokio::test]
async fn test_search_get_aggregates_vendors() {
    let app = setup_app(love_story_source(), &["A", "B"]);

    // 愛情 percent-encoded
    let response = app
        .oneshot(get("/api/search?keyword=%E6%84%9B%E6%83%85&searchType=auto"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["keyword"], "愛情");
    assert_eq!(json["searchType"], "auto");
    assert_eq!(json["total"], 1);
    assert_eq!(json["partial"], false);

    let song = &json["results"][0];
    assert_eq!(song["歌名"], "愛情故事");
    assert_eq!(song["歌手"], "S1");
    assert_eq!(song["語言"], "國語");
    assert_eq!(
        song["編號資訊"],
        json!([
            { "公司": "A", "編號": "A1" },
            { "公司": "B", "編號": "B2" }
        ])
    );
}

#[tokio::test]
async fn test_live_search_post() {
    let app = setup_app(love_story_source(), &["A", "B"]);

    let response = app
        .oneshot(post_json(
            "/api/live-search",
            json!({ "keyword": " 快樂 ", "searchType": "song" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["keyword"], "快樂");
    assert_eq!(json["searchType"], "song");
    assert_eq!(json["total"], 1);
    assert_eq!(json["results"][0]["歌手"], "S2");
}

#[tokio::test]
async fn test_search_with_failing_upstream_is_empty_success() {
    let app = setup_app(Arc::new(FailingSource), &["A", "B"]);

    let response = app
        .oneshot(get("/api/search?keyword=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["total"], 0);
    assert_eq!(json["results"], json!([]));
    assert!(json["stats"]["requestsFailed"].as_u64().unwrap() > 0);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_search_requires_keyword() {
    let app = setup_app(Arc::new(ScriptedSource::new()), &["A"]);

    let response = app.oneshot(get("/api/search")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_blank_keyword_rejected_without_upstream_calls() {
    let source = Arc::new(ScriptedSource::new());
    let app = setup_app(source.clone(), &["A"]);

    let response = app
        .oneshot(post_json("/api/live-search", json!({ "keyword": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_search_type_rejected() {
    let app = setup_app(Arc::new(ScriptedSource::new()), &["A"]);

    let response = app
        .oneshot(get("/api/search?keyword=abc&searchType=album"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Catalog passthrough
// =============================================================================

#[tokio::test]
async fn test_catalog_lookup_truncates_to_limit() {
    let records: Vec<RawSongRecord> = (0..60)
        .map(|i| RawSongRecord::new(&format!("Song {}", i), "Singer", &i.to_string(), "錢櫃"))
        .collect();
    let source = Arc::new(ScriptedSource::new().with_records(CATCH_ALL_COMPANY, records));
    let app = setup_app(source.clone(), &[CATCH_ALL_COMPANY]);

    let response = app
        .oneshot(get("/api/taiwan-search?keyword=Song"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["total"], 60);
    assert_eq!(json["data"].as_array().unwrap().len(), 50);
    assert_eq!(json["data"][0]["歌名"], "Song 0");
    assert_eq!(json["data"][0]["公司"], "錢櫃");
    assert_eq!(source.calls().len(), 1);
}

#[tokio::test]
async fn test_catalog_lookup_upstream_failure_is_bad_gateway() {
    let source = Arc::new(
        ScriptedSource::new().with_failure(CATCH_ALL_COMPANY, || CatalogError::Status(503)),
    );
    let app = setup_app(source, &[CATCH_ALL_COMPANY]);

    let response = app
        .oneshot(get("/api/taiwan-search?keyword=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_catalog_lookup_non_array_is_empty() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_failure(CATCH_ALL_COMPANY, || CatalogError::NotAnArray("object")),
    );
    let app = setup_app(source, &[CATCH_ALL_COMPANY]);

    let response = app
        .oneshot(get("/api/taiwan-search?keyword=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["total"], 0);
    assert_eq!(json["data"], json!([]));
}
