//! Access-log middleware.
//!
//! Wraps the whole router so that every request, including errors, 405s and
//! CORS preflights, yields exactly one [`AccessRecord`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};

use crate::access::{AccessRecord, AccessSink, CompressionRatio};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Build an [`AccessRecord`] for the request and hand it to the sink once the
/// response headers are ready.
pub async fn access_log_middleware(
    State(sink): State<Arc<dyn AccessSink>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut record = AccessRecord::new(format!(
        "{} {} {:?}",
        request.method(),
        path_and_query,
        request.version()
    ));
    // Absent when the router is driven without a listener (tests)
    record.remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let headers = request.headers();
    record.referer = header_string(headers, &header::REFERER);
    record.user_agent = header_string(headers, &header::USER_AGENT);
    record.forwarded_for = header_string(headers, &X_FORWARDED_FOR);

    let response = next.run(request).await;

    record.status = response.status().as_u16();
    record.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    record.gzip_ratio = response
        .extensions()
        .get::<CompressionRatio>()
        .map(|CompressionRatio(ratio)| *ratio);
    record.request_time = start.elapsed();

    sink.record(record);
    response
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}
