//! gzip negotiation tests.
//!
//! Tests verify:
//! - Round trip of on-the-fly compression
//! - Threshold, type, Accept-Encoding and no-transform handling
//! - Stored `.gz` representations

use axum::http::StatusCode;

use static_tiles::policy::{gunzip, gzip};

use super::test_utils::{
    body_bytes, build_router, build_router_with, get, header, large_text, test_config,
    write_file, RecordingSink,
};

// =============================================================================
// On-the-fly Compression
// =============================================================================

#[tokio::test]
async fn test_gzip_round_trip() {
    let root = tempfile::tempdir().unwrap();
    let text = large_text();
    write_file(root.path(), "frames.txt", &text);
    let router = build_router(root.path());

    let response = get(&router, "/frames.txt", &[("accept-encoding", "gzip, deflate")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-encoding"), "gzip");
    assert_eq!(header(&response, "vary"), "accept-encoding");
    assert!(header(&response, "etag").starts_with("W/"));

    let body = body_bytes(response).await;
    assert!(body.len() < text.len());
    assert_eq!(gunzip(&body).unwrap(), text.as_bytes());
}

#[tokio::test]
async fn test_identity_when_client_does_not_accept_gzip() {
    let root = tempfile::tempdir().unwrap();
    let text = large_text();
    write_file(root.path(), "frames.txt", &text);
    let router = build_router(root.path());

    for accept in [None, Some("identity"), Some("gzip;q=0"), Some("*, gzip;q=0")] {
        let headers: Vec<(&str, &str)> = accept.map(|a| ("accept-encoding", a)).into_iter().collect();
        let response = get(&router, "/frames.txt", &headers).await;

        assert!(response.headers().get("content-encoding").is_none(), "{accept:?}");
        assert_eq!(header(&response, "vary"), "accept-encoding");
        assert_eq!(body_bytes(response).await, text.as_bytes());
    }
}

#[tokio::test]
async fn test_wildcard_accepts_gzip() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "frames.txt", large_text());
    let router = build_router(root.path());

    let response = get(&router, "/frames.txt", &[("accept-encoding", "*")]).await;
    assert_eq!(header(&response, "content-encoding"), "gzip");
}

#[tokio::test]
async fn test_below_threshold_not_compressed() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "small.json", vec![b' '; 999]);
    let router = build_router(root.path());

    let response = get(&router, "/small.json", &[("accept-encoding", "gzip")]).await;
    assert!(response.headers().get("content-encoding").is_none());
    assert!(response.headers().get("vary").is_none());
    assert_eq!(body_bytes(response).await.len(), 999);
}

#[tokio::test]
async fn test_incompressible_type_not_compressed() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "big.png", vec![0u8; 50_000]);
    write_file(root.path(), "big.bin", vec![0u8; 50_000]);
    let router = build_router(root.path());

    for uri in ["/big.png", "/big.bin"] {
        let response = get(&router, uri, &[("accept-encoding", "gzip")]).await;
        assert!(response.headers().get("content-encoding").is_none(), "{uri}");
        assert_eq!(body_bytes(response).await.len(), 50_000);
    }
}

#[tokio::test]
async fn test_request_no_transform_skips_compression() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "frames.txt", large_text());
    let router = build_router(root.path());

    let response = get(
        &router,
        "/frames.txt",
        &[("accept-encoding", "gzip"), ("cache-control", "no-transform")],
    )
    .await;
    assert!(response.headers().get("content-encoding").is_none());
}

#[tokio::test]
async fn test_gzip_disabled_and_configured_threshold() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "frames.txt", large_text());
    write_file(root.path(), "short.txt", vec![b'a'; 200]);

    let config = test_config(root.path(), &["--gzip", "false"]);
    let router = build_router_with(&config, RecordingSink::new());
    let response = get(&router, "/frames.txt", &[("accept-encoding", "gzip")]).await;
    assert!(response.headers().get("content-encoding").is_none());

    let config = test_config(root.path(), &["--gzip-min-length", "100"]);
    let router = build_router_with(&config, RecordingSink::new());
    let response = get(&router, "/short.txt", &[("accept-encoding", "gzip")]).await;
    assert_eq!(header(&response, "content-encoding"), "gzip");
}

// =============================================================================
// Stored gzip Representations
// =============================================================================

#[tokio::test]
async fn test_stored_gz_passed_through() {
    let root = tempfile::tempdir().unwrap();
    let json = br#"{"tiles":[[0,0],[0,1],[1,0],[1,1]]}"#;
    let stored = gzip(json, 9).unwrap();
    write_file(root.path(), "pyramid.json.gz", &stored);
    let router = build_router(root.path());

    let response = get(&router, "/pyramid.json", &[("accept-encoding", "gzip")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "application/json");
    assert_eq!(header(&response, "content-encoding"), "gzip");
    assert_eq!(header(&response, "cache-control"), "public, max-age=10");
    assert_eq!(body_bytes(response).await, stored);
}

#[tokio::test]
async fn test_stored_gz_decompressed_for_identity_clients() {
    let root = tempfile::tempdir().unwrap();
    let json = br#"{"tiles":[[0,0]]}"#;
    write_file(root.path(), "pyramid.json.gz", gzip(json, 6).unwrap());
    let router = build_router(root.path());

    let response = get(&router, "/pyramid.json", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("content-encoding").is_none());
    assert_eq!(header(&response, "vary"), "accept-encoding");
    assert_eq!(body_bytes(response).await.as_ref(), json);
}

#[tokio::test]
async fn test_stored_multi_member_gz_decompressed_in_full() {
    let root = tempfile::tempdir().unwrap();
    let mut stored = gzip(b"{\"part\":1,", 6).unwrap();
    stored.extend(gzip(b"\"rest\":2}", 6).unwrap());
    write_file(root.path(), "pyramid.json.gz", &stored);
    let router = build_router(root.path());

    let identity = get(&router, "/pyramid.json", &[]).await;
    assert_eq!(identity.status(), StatusCode::OK);
    let identity = body_bytes(identity).await;
    assert_eq!(identity.as_ref(), b"{\"part\":1,\"rest\":2}");

    let encoded = get(&router, "/pyramid.json", &[("accept-encoding", "gzip")]).await;
    let encoded = body_bytes(encoded).await;
    assert_eq!(gunzip(&encoded).unwrap(), identity.to_vec());
}

#[tokio::test]
async fn test_corrupt_stored_gz_is_500() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "x.json.gz", b"not gzip");
    let router = build_router(root.path());

    let response = get(&router, "/x.json", &[]).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"], "io_error");
    assert_eq!(json["status"], 500);

    // Clients accepting gzip get the stored bytes untouched
    let response = get(&router, "/x.json", &[("accept-encoding", "gzip")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), b"not gzip");
}

#[tokio::test]
async fn test_stored_gz_routes_on_logical_name() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "tile.png.gz", gzip(b"png-bytes", 6).unwrap());
    let router = build_router(root.path());

    let response = get(&router, "/tile.png", &[("accept-encoding", "gzip")]).await;
    assert_eq!(header(&response, "cache-control"), "public, max-age=3600");
    assert_eq!(header(&response, "content-type"), "image/png");
}

#[tokio::test]
async fn test_existing_file_preferred_over_gz() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "info.json", br#"{"plain":true}"#);
    write_file(root.path(), "info.json.gz", gzip(br#"{"plain":false}"#, 6).unwrap());
    let router = build_router(root.path());

    let response = get(&router, "/info.json", &[("accept-encoding", "gzip")]).await;
    assert!(response.headers().get("content-encoding").is_none());
    assert_eq!(body_bytes(response).await.as_ref(), br#"{"plain":true}"#);
}

#[tokio::test]
async fn test_stored_files_never_modified() {
    let root = tempfile::tempdir().unwrap();
    let text = large_text();
    write_file(root.path(), "frames.txt", &text);
    let router = build_router(root.path());

    let _ = get(&router, "/frames.txt", &[("accept-encoding", "gzip")]).await;

    let on_disk = std::fs::read(root.path().join("frames.txt")).unwrap();
    assert_eq!(on_disk, text.as_bytes());
    assert!(!root.path().join("frames.txt.gz").exists());
}
