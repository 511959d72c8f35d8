//! Shared application state threaded through every axum handler.

use std::sync::Arc;

use smartmob_domain::{EventSink, WorkspacePaths};

use crate::registry::Registry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub paths: Arc<WorkspacePaths>,
    pub client: reqwest::Client,
    pub sink: Arc<dyn EventSink>,
}
