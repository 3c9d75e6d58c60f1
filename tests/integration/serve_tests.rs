//! File serving and cache lifetime tests.
//!
//! Tests verify:
//! - Image-suffix files get the long lifetime, everything else the short one
//! - Content types and validators
//! - HEAD, 405 and the health endpoint
//! - Conditional requests

use axum::http::StatusCode;
use serde_json::Value;

use super::test_utils::{
    body_bytes, build_router, build_router_with, get, header, scenario_root, send, test_config,
    write_file, RecordingSink,
};

// =============================================================================
// Reference Scenario
// =============================================================================

#[tokio::test]
async fn test_image_gets_long_lifetime_uncompressed() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = get(&router, "/a.png", &[("accept-encoding", "gzip")]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "cache-control"), "public, max-age=3600");
    assert_eq!(header(&response, "content-type"), "image/png");
    assert!(response.headers().get("content-encoding").is_none());
    assert_eq!(body_bytes(response).await.len(), 2000);
}

#[tokio::test]
async fn test_small_text_gets_short_lifetime_uncompressed() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = get(&router, "/b.txt", &[("accept-encoding", "gzip")]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "cache-control"), "public, max-age=10");
    assert!(header(&response, "content-type").starts_with("text/plain"));
    assert!(response.headers().get("content-encoding").is_none());
    assert_eq!(body_bytes(response).await, vec![b'b'; 50]);
}

#[tokio::test]
async fn test_image_rule_ignores_size_and_case() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "tiles/0/0_0.PNG", vec![1u8; 5]);
    write_file(root.path(), "tiles/0/huge.png", vec![1u8; 200_000]);
    let router = build_router(root.path());

    for uri in ["/tiles/0/0_0.PNG", "/tiles/0/huge.png"] {
        let response = get(&router, uri, &[]).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(header(&response, "cache-control"), "public, max-age=3600");
    }
}

#[tokio::test]
async fn test_non_image_types_get_short_lifetime() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "meta/info.json", br#"{"levels":3}"#);
    write_file(root.path(), "thumb.jpg", vec![0xffu8; 10]);
    let router = build_router(root.path());

    let response = get(&router, "/meta/info.json", &[]).await;
    assert_eq!(header(&response, "cache-control"), "public, max-age=10");
    assert_eq!(header(&response, "content-type"), "application/json");

    let response = get(&router, "/thumb.jpg", &[]).await;
    assert_eq!(header(&response, "cache-control"), "public, max-age=10");
    assert_eq!(header(&response, "content-type"), "image/jpeg");
}

#[tokio::test]
async fn test_configured_image_extensions_and_lifetimes() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "a.webp", b"w");
    write_file(root.path(), "a.txt", b"t");
    let config = test_config(
        root.path(),
        &[
            "--image-extensions",
            "png,webp",
            "--image-max-age",
            "86400",
            "--default-max-age",
            "60",
        ],
    );
    let router = build_router_with(&config, RecordingSink::new());

    let response = get(&router, "/a.webp", &[]).await;
    assert_eq!(header(&response, "cache-control"), "public, max-age=86400");

    let response = get(&router, "/a.txt", &[]).await;
    assert_eq!(header(&response, "cache-control"), "public, max-age=60");
}

#[tokio::test]
async fn test_missing_file_is_json_404() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = get(&router, "/nope.png", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_file_as_directory_component_is_404() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = get(&router, "/b.txt/inner", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_file_with_trailing_slash_is_404() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = get(&router, "/b.txt/", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_percent_encoded_name() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "level 1/tile a.png", b"png");
    let router = build_router(root.path());

    let response = get(&router, "/level%201/tile%20a.png", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), b"png");
}

// =============================================================================
// Methods
// =============================================================================

#[tokio::test]
async fn test_head_returns_headers_without_body() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = send(&router, "HEAD", "/a.png", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-length"), "2000");
    assert_eq!(header(&response, "cache-control"), "public, max-age=3600");
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_other_methods_rejected() {
    let root = scenario_root();
    let router = build_router(root.path());

    for method in ["POST", "PUT", "DELETE"] {
        let response = send(&router, method, "/a.png", &[]).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(header(&response, "allow"), "GET, HEAD");
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = get(&router, "/health", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

// =============================================================================
// Conditional Requests
// =============================================================================

#[tokio::test]
async fn test_etag_round_trip_yields_304() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = get(&router, "/a.png", &[]).await;
    let etag = header(&response, "etag").to_string();
    assert!(response.headers().contains_key("last-modified"));

    let response = get(&router, "/a.png", &[("if-none-match", &etag)]).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header(&response, "cache-control"), "public, max-age=3600");
    assert_eq!(header(&response, "etag"), etag);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_if_modified_since_yields_304() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = get(&router, "/b.txt", &[]).await;
    let last_modified = header(&response, "last-modified").to_string();

    let response = get(&router, "/b.txt", &[("if-modified-since", &last_modified)]).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_not_modified_carries_vary_for_negotiable_file() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "frames.txt", super::test_utils::large_text());
    let router = build_router(root.path());

    let response = get(&router, "/frames.txt", &[("accept-encoding", "gzip")]).await;
    assert_eq!(header(&response, "vary"), "accept-encoding");
    let etag = header(&response, "etag").to_string();

    let response = get(
        &router,
        "/frames.txt",
        &[("accept-encoding", "gzip"), ("if-none-match", &etag)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header(&response, "vary"), "accept-encoding");
    assert_eq!(header(&response, "etag"), etag);
}

#[tokio::test]
async fn test_stale_etag_serves_body() {
    let root = scenario_root();
    let router = build_router(root.path());

    let response = get(&router, "/a.png", &[("if-none-match", "\"0-0\"")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.len(), 2000);
}
