//! Route handlers (C9).

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use smartmob_domain::{ProcessRecord, Slug};

use super::schema::{CreateRequest, DeleteResponse, ErrorResponse, IndexResponse, ListResponse, ProcessDetail};
use crate::pipeline;
use crate::state::AppState;

fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

pub async fn index(headers: HeaderMap) -> Json<IndexResponse> {
    let base = base_url(&headers);
    Json(IndexResponse {
        list: format!("{base}/list-processes"),
        create: format!("{base}/create-process"),
    })
}

pub async fn list_processes(State(state): State<AppState>, headers: HeaderMap) -> Json<ListResponse> {
    let base = base_url(&headers);
    let processes = state
        .registry
        .list()
        .iter()
        .map(|record| ProcessDetail::from_record(record, &base))
        .collect();
    Json(ListResponse { processes })
}

pub async fn create_process(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Response {
    // Any malformed-body rejection (bad JSON syntax, a missing or
    // mistyped field) is a 400 here, not axum's default 422: the schema
    // taxonomy draws no line between the two.
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };
    let base = base_url(&headers);
    let record = ProcessRecord::new(
        body.app.clone(),
        body.node.clone(),
        body.source_url,
        body.process_type,
        body.env,
    );

    let record = match state.registry.insert_unique(record) {
        Ok(record) => record,
        Err(_) => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("process \"{}.{}\" already exists", body.app, body.node),
                }),
            )
                .into_response();
        }
    };

    let mut fields = BTreeMap::new();
    fields.insert("app".to_string(), json!(record.app));
    fields.insert("node".to_string(), json!(record.node));
    fields.insert("slug".to_string(), json!(record.slug.as_str()));
    state.sink.info("process.create", fields);

    let handle = tokio::spawn(pipeline::run(
        record.clone(),
        state.paths.clone(),
        state.client.clone(),
        state.sink.clone(),
    ));
    *record.pipeline_handle.lock() = Some(handle);

    let detail = ProcessDetail::from_record(&record, &base);
    let location = HeaderValue::from_str(&detail.details).ok();
    let mut response = (StatusCode::CREATED, Json(detail)).into_response();
    if let Some(location) = location {
        response.headers_mut().insert(axum::http::header::LOCATION, location);
    }
    response
}

pub async fn process_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    let base = base_url(&headers);
    match state.registry.get(&Slug::from_raw(slug.clone())) {
        Some(record) => Json(ProcessDetail::from_record(&record, &base)).into_response(),
        None => not_found(&slug),
    }
}

pub async fn delete_process(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let key = Slug::from_raw(slug.clone());
    let Some(record) = state.registry.get(&key) else {
        return not_found(&slug);
    };

    record.stop_signal.fire();
    let handle = record.pipeline_handle.lock().take();
    if let Some(handle) = handle {
        let _ = handle.await;
    }
    state.registry.remove(&key);

    (StatusCode::OK, Json(DeleteResponse {})).into_response()
}

fn not_found(slug: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("no such process \"{slug}\""),
        }),
    )
        .into_response()
}
