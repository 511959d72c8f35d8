pub mod handlers;
pub mod middleware;
pub mod schema;
pub mod ws;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full HTTP router.
///
/// Middleware order (outermost first, matching the contract in C9):
/// 1. request-id — assigns/propagates `X-Request-Id`.
/// 2. access-log — emits one `http.access` event per request.
///
/// Since `axum::Router::layer` wraps outside-in, the last `.layer()` call
/// is the outermost: `request_id` is added last so it runs first.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/list-processes", get(handlers::list_processes))
        .route("/create-process", post(handlers::create_process))
        .route("/process-status/:slug", get(handlers::process_status))
        .route("/delete-process/:slug", post(handlers::delete_process))
        .route("/attach-console/:slug", get(ws::attach_console))
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::access_log,
        ))
        .layer(axum_middleware::from_fn(middleware::request_id))
        .with_state(state)
}
