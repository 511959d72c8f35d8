//! Wire-format DTOs for the HTTP façade (C9).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use smartmob_domain::ProcessRecord;

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub list: String,
    pub create: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub app: String,
    pub node: String,
    pub source_url: String,
    pub process_type: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessDetail {
    pub app: String,
    pub slug: String,
    pub attach: String,
    pub details: String,
    pub delete: String,
    pub state: smartmob_domain::ProcessState,
}

impl ProcessDetail {
    pub fn from_record(record: &ProcessRecord, base_url: &str) -> Self {
        let slug = record.slug.as_str().to_string();
        let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base_url.to_string()
        };
        Self {
            app: record.app.clone(),
            details: format!("{base_url}/process-status/{slug}"),
            attach: format!("{ws_base}/attach-console/{slug}"),
            delete: format!("{base_url}/delete-process/{slug}"),
            slug,
            state: record.state(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub processes: Vec<ProcessDetail>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {}
