//! Endpoint self-check.

use axum::http::StatusCode;
use serde_json::json;

use super::response::{self, HttpResponse};

/// `GET /health` — always 200 with `{"ok":true}`.
///
/// Reports only that the server answers; it never consults the producer.
pub fn health() -> HttpResponse {
    response::json(StatusCode::OK, json!({ "ok": true }).to_string())
}
