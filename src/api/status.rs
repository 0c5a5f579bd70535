//! Producer liveness endpoint (`GET /stream_started`).

use axum::http::StatusCode;
use serde_json::json;
use tracing::info;

use super::response::{self, HttpResponse};
use crate::monitor::Liveness;

/// `GET /stream_started` — current liveness of the stream producer.
///
/// ```json
/// {"started":true}
/// ```
///
/// Always 200; a dead or never-started producer is `false`, not an error.
pub fn stream_started(liveness: &dyn Liveness) -> HttpResponse {
    let started = liveness.is_active();
    info!(started, "GET /stream_started");
    response::json(StatusCode::OK, json!({ "started": started }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::SharedFlag;

    fn body_json(resp: &HttpResponse) -> serde_json::Value {
        serde_json::from_str(resp.body()).unwrap()
    }

    #[test]
    fn reports_active_producer() {
        let resp = stream_started(&SharedFlag::new(true));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body(), "{\"started\":true}\n");
    }

    #[test]
    fn reports_inactive_producer_as_200_false() {
        let resp = stream_started(&SharedFlag::new(false));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(&resp), json!({ "started": false }));
    }

    #[test]
    fn body_has_exactly_one_boolean_field() {
        let json = body_json(&stream_started(&SharedFlag::new(true)));
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj["started"].is_boolean());
    }
}
