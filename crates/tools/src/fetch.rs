//! Archive fetcher (C2): download a URL to disk, enforcing a content-type
//! allowlist before any bytes are written.

use std::path::Path;

use smartmob_domain::{Error, Result};

/// Accepts exactly the two archive content types the pipeline knows how to
/// unpack. Anything else — including a missing header — is rejected.
pub fn default_accept(content_type: Option<&str>) -> bool {
    matches!(
        content_type,
        Some("application/zip") | Some("application/x-gtar")
    )
}

/// Download `url` to `dest_path`, returning the response's `Content-Type`.
///
/// The full response body is buffered in memory before being written to
/// disk — no streaming, no retry (see design notes: acceptable only for
/// small archives).
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    dest_path: &Path,
    accept: impl Fn(Option<&str>) -> bool,
) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|_| Error::DownloadFailed)?;

    if !response.status().is_success() {
        return Err(Error::DownloadFailed);
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(';').next().unwrap_or(s).trim().to_string());

    if !accept(content_type.as_deref()) {
        return Err(Error::DownloadRejected);
    }

    let body = response.bytes().await.map_err(|_| Error::DownloadFailed)?;

    if let Some(parent) = dest_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest_path, &body).await?;

    Ok(content_type.unwrap_or_default())
}
