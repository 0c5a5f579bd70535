//! Fixed-shape HTTP/1.1 responses and their wire encoding.
//!
//! Every response is self-contained: exact `Content-Length`, `Connection: close`,
//! no caching, and a permissive CORS origin so browser dashboards can poll
//! without a proxy.

use axum::http::{header, HeaderValue, Response, StatusCode};
use bytes::{Bytes, BytesMut};

pub type HttpResponse = Response<String>;

const JSON: &str = "application/json; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

/// `200`-style JSON response. `body` must already be serialized.
pub fn json(status: StatusCode, body: impl Into<String>) -> HttpResponse {
    build(status, JSON, body.into())
}

/// Plain-text response.
pub fn text(status: StatusCode, body: impl Into<String>) -> HttpResponse {
    build(status, TEXT, body.into())
}

fn build(status: StatusCode, content_type: &'static str, mut body: String) -> HttpResponse {
    body.push('\n');

    let mut response = Response::new(body);
    *response.status_mut() = status;

    let len = response.body().len();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, must-revalidate"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Serialize status line, headers, and body into one buffer.
pub fn encode(response: &HttpResponse) -> Bytes {
    let status = response.status();
    let body = response.body().as_bytes();

    let mut out = BytesMut::with_capacity(256 + body.len());
    out.extend_from_slice(b"HTTP/1.1 ");
    out.extend_from_slice(status.as_str().as_bytes());
    out.extend_from_slice(b" ");
    out.extend_from_slice(status.canonical_reason().unwrap_or("Unknown").as_bytes());
    out.extend_from_slice(b"\r\n");
    for (name, value) in response.headers() {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out.freeze()
}
