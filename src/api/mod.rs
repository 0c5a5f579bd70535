//! Request-line dispatch for the status server.
//!
//! There is no router: the raw request line is matched by literal prefix, so
//! `GET /health?x=1` and `GET /healthz` both land on the health check, and
//! anything that is not a `GET` of a known path is a 404.

use std::sync::Arc;

use axum::http::StatusCode;
use tracing::debug;

use crate::monitor::Liveness;

pub mod health;
pub mod response;
pub mod status;

pub use response::HttpResponse;

const STREAM_STARTED: &str = "GET /stream_started";
const HEALTH: &str = "GET /health";

/// Maps request lines to responses, consulting a [`Liveness`] source.
#[derive(Clone)]
pub struct StatusEndpoint {
    liveness: Arc<dyn Liveness>,
}

impl StatusEndpoint {
    pub fn new(liveness: Arc<dyn Liveness>) -> Self {
        Self { liveness }
    }

    /// Answer one request line.
    pub fn handle(&self, request_line: &str) -> HttpResponse {
        if request_line.starts_with(STREAM_STARTED) {
            status::stream_started(self.liveness.as_ref())
        } else if request_line.starts_with(HEALTH) {
            debug!("GET /health");
            health::health()
        } else {
            debug!(request_line, "unrecognised request");
            not_found()
        }
    }
}

fn not_found() -> HttpResponse {
    response::text(StatusCode::NOT_FOUND, "Not Found")
}
