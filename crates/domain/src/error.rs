/// Shared error type for the fetch -> unpack -> manifest -> provision -> supervise pipeline.
///
/// Each variant's `Display` message is part of the observable contract: it is what
/// ends up in `pipeline.state` event payloads and, at the HTTP boundary, in
/// `{"error": "..."}` response bodies.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Download failed.")]
    DownloadFailed,

    #[error("Download rejected.")]
    DownloadRejected,

    #[error("Unknown archive format \"{0}\".")]
    InvalidArchiveFormat(String),

    #[error("archive extraction failed: {0}")]
    ExtractFailed(String),

    #[error("no procfile")]
    NoManifest,

    #[error("unknown process type \"{0}\"")]
    UnknownProcessType(String),

    #[error("virtual environment failure: {0}")]
    EnvCreateFailed(String),

    #[error("pip install failure: {0}")]
    DepsInstallFailed(String),

    #[error("supervisor could not spawn \"{command}\": {message}")]
    SupervisorSpawnFailed { command: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
