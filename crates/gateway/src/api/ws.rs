//! Attach-console WebSocket endpoint (C9).
//!
//! The upgrade succeeds for a known slug; the socket is then closed
//! immediately, since streaming the supervised process's output to
//! attached consoles is out of scope (see the supervisor's bounded
//! output ring, which is forwarded through C10 instead).

use std::collections::BTreeMap;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use smartmob_domain::Slug;

use super::schema::ErrorResponse;
use crate::state::AppState;

pub async fn attach_console(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    let key = Slug::from_raw(slug.clone());
    if state.registry.get(&key).is_none() {
        return (
            StatusCode::NOT_FOUND,
            axum::Json(ErrorResponse {
                error: format!("no such process \"{slug}\""),
            }),
        )
            .into_response();
    }

    let mut fields = BTreeMap::new();
    fields.insert("slug".to_string(), json!(slug));
    state.sink.info("process.attach", fields);

    ws.on_upgrade(|socket| async move {
        drop(socket);
    })
    .into_response()
}
