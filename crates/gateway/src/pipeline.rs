//! Lifecycle pipeline & state machine (C7) — the core of the agent.
//!
//! One asynchronous task per record, sequencing fetch -> unpack -> manifest
//! -> provision -> supervise. The record's `state` field is this task's
//! only observable output; every other component only reads it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use smartmob_domain::{EventSink, ProcessRecord, ProcessState, WorkspacePaths};
use smartmob_tools::{extract, fetch, manifest, provision, supervisor};

fn emit_state(sink: &dyn EventSink, record: &ProcessRecord, state: ProcessState) {
    record.set_state(state);
    let mut fields = BTreeMap::new();
    fields.insert("slug".to_string(), json!(record.slug.as_str()));
    fields.insert("state".to_string(), json!(state.as_str()));
    sink.info("pipeline.state", fields);
    tracing::info!(slug = %record.slug, state = %state, "pipeline state transition");
}

/// Map the content-type the fetcher reports to the extractor's format tag.
fn archive_format(content_type: &str) -> Option<&'static str> {
    match content_type {
        "application/zip" => Some("zip"),
        "application/x-gtar" => Some("tar"),
        _ => None,
    }
}

/// Run the full pipeline for `record`. Returns once the record has reached
/// a terminal state (`no procfile` / `unknown process type`), the
/// supervised process has been stopped via `record.stop_signal`, or an
/// unrecoverable error occurred — in which case the error is logged but
/// not propagated past this task (the record's terminal state already
/// tells the story; see the error taxonomy's propagation policy).
pub async fn run(
    record: Arc<ProcessRecord>,
    paths: Arc<WorkspacePaths>,
    client: reqwest::Client,
    sink: Arc<dyn EventSink>,
) {
    let archive_path = paths.archive_path(&record.slug);
    let source_path = paths.source_path(&record.slug);
    let env_path = paths.env_path(&record.slug);

    emit_state(&*sink, &record, ProcessState::Downloading);
    let content_type = match fetch::fetch(&client, &record.source_url, &archive_path, fetch::default_accept).await {
        Ok(content_type) => content_type,
        Err(e) => {
            emit_state(&*sink, &record, ProcessState::DownloadFailure);
            tracing::warn!(slug = %record.slug, error = %e, "download failed");
            return;
        }
    };

    emit_state(&*sink, &record, ProcessState::Unpacking);
    let Some(format) = archive_format(&content_type) else {
        // No distinct terminal state for this case (see the error taxonomy):
        // the task ends failed, the record is left in `unpacking`.
        tracing::warn!(slug = %record.slug, content_type, "unrecognized archive content type");
        return;
    };
    let unpack_archive_path = archive_path.clone();
    let unpack_source_path = source_path.clone();
    let unpack_result = tokio::task::spawn_blocking(move || {
        extract::unpack(format, &unpack_archive_path, &unpack_source_path)
    })
    .await;
    match unpack_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(slug = %record.slug, error = %e, "archive extraction failed");
            return;
        }
        Err(e) => {
            tracing::error!(slug = %record.slug, error = %e, "extraction task panicked");
            return;
        }
    }

    emit_state(&*sink, &record, ProcessState::Processing);
    let types = match manifest::load_manifest(&source_path).await {
        Ok(types) => types,
        Err(_) => {
            emit_state(&*sink, &record, ProcessState::NoProcfile);
            return;
        }
    };
    let template = match manifest::resolve(&types, &record.process_type) {
        Ok(template) => template.clone(),
        Err(_) => {
            emit_state(&*sink, &record, ProcessState::UnknownProcessType);
            return;
        }
    };

    if let Err(e) = provision::create_env(&env_path).await {
        emit_state(&*sink, &record, ProcessState::VirtualEnvironmentFailure);
        tracing::warn!(slug = %record.slug, error = %e, "environment creation failed");
        return;
    }
    if let Err(e) = provision::install_deps(&env_path, &source_path).await {
        emit_state(&*sink, &record, ProcessState::PipInstallFailure);
        tracing::warn!(slug = %record.slug, error = %e, "dependency install failed");
        return;
    }

    let mut env = template.env.clone();
    for (key, value) in &record.env {
        env.insert(key.clone(), value.clone());
    }

    emit_state(&*sink, &record, ProcessState::Running);
    if let Err(e) = supervisor::run_and_respawn(
        record.slug.as_str(),
        &template.command,
        &env,
        &record.stop_signal,
        sink.clone(),
    )
    .await
    {
        tracing::warn!(slug = %record.slug, error = %e, "supervisor ended with an error");
    }
}
