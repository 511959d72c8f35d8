//! CLI & bootstrap flags (C11).

use clap::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormatArg {
    Kv,
    Json,
}

/// smartmob-agent — deploys and supervises long-running processes from
/// source archives.
///
/// `--version` is handled manually (not via clap's built-in flag) because
/// the contract is to print the bare version string, not `name version`.
#[derive(Debug, Parser)]
#[command(name = "smartmob-agent", disable_version_flag = true, about)]
pub struct Cli {
    /// Print the version string alone and exit, without binding a
    /// listener or touching the workspace.
    #[arg(long)]
    pub version: bool,

    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    #[arg(long, value_enum, default_value_t = LogFormatArg::Kv)]
    pub log_format: LogFormatArg,

    /// Render all timestamps (sink and tracing) in UTC.
    #[arg(long, default_value_t = false)]
    pub utc: bool,

    /// C10 sink endpoint. Falls back to `SMARTMOB_LOGGING_ENDPOINT`, then
    /// `file:///dev/stdout`.
    #[arg(long)]
    pub logging_endpoint: Option<String>,
}

impl Cli {
    pub fn resolved_logging_endpoint(&self) -> String {
        self.logging_endpoint
            .clone()
            .or_else(|| std::env::var("SMARTMOB_LOGGING_ENDPOINT").ok())
            .unwrap_or_else(|| "file:///dev/stdout".to_string())
    }
}
