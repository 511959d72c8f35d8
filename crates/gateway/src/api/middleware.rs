//! Request-id and access-log middleware (C9 middleware chain).

use std::collections::BTreeMap;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Reads `X-Request-Id`, or assigns a fresh UUID; stores it as a request
/// extension and copies it back onto the response.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response {
    let id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}

#[derive(Clone)]
pub struct RequestId(pub String);

/// Emits one `http.access` event per request through C10, after the
/// handler has produced its response.
pub async fn access_log(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let arrived_at = Utc::now();
    let started = Instant::now();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "?".to_string());

    let response = next.run(request).await;
    let duration = started.elapsed().as_secs_f64();

    let mut fields = BTreeMap::new();
    fields.insert("path".to_string(), json!(path));
    fields.insert("outcome".to_string(), json!(response.status().as_u16()));
    fields.insert("duration".to_string(), json!(duration));
    fields.insert("request".to_string(), json!(request_id));
    fields.insert("@timestamp".to_string(), json!(arrived_at.to_rfc3339()));
    state.sink.info("http.access", fields);

    response
}
