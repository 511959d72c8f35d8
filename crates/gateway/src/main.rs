use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use smartmob_domain::EventSink;
use smartmob_gateway::cli::{Cli, LogFormatArg};
use smartmob_gateway::logging::{self, LogFormat, Sink};
use smartmob_gateway::registry::Registry;
use smartmob_gateway::state::AppState;
use smartmob_gateway::{api, workspace};

/// Open connections get this long to finish before the listener is torn
/// down on SIGINT.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_tracing(cli.log_format);

    let endpoint = cli.resolved_logging_endpoint();
    let parsed_endpoint = logging::parse_endpoint(&endpoint)
        .with_context(|| format!("resolving logging endpoint {endpoint:?}"))?;
    let log_format = match cli.log_format {
        LogFormatArg::Kv => LogFormat::Kv,
        LogFormatArg::Json => LogFormat::Json,
    };
    let sink: Arc<dyn EventSink> =
        Arc::new(Sink::connect(parsed_endpoint, log_format, cli.utc).context("connecting logging sink")?);

    let workspace_root = std::path::PathBuf::from("./.smartmob");
    let paths = Arc::new(
        workspace::bootstrap(workspace_root).context("bootstrapping workspace directories")?,
    );

    let app_state = AppState {
        registry: Arc::new(Registry::new()),
        paths,
        client: reqwest::Client::new(),
        sink: sink.clone(),
    };

    let router = api::router(app_state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    let mut bind_fields = BTreeMap::new();
    bind_fields.insert("addr".to_string(), json!(addr));
    sink.info("bind", bind_fields);
    tracing::info!(%addr, "smartmob-agent listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("SIGINT received, shutting down");
    tokio::time::sleep(SHUTDOWN_GRACE).await;
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,smartmob_gateway=debug"));
    match format {
        LogFormatArg::Json => {
            tracing_subscriber::fmt().with_env_filter(filter).json().init();
        }
        LogFormatArg::Kv => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
