//! Structured logging sink (C10): the client-facing event stream, wired
//! up once at startup from a single endpoint URL.

pub mod forwarder;
pub mod sink;

pub use sink::{LogFormat, Sink};

use smartmob_domain::{Error, Result};

/// Where C10 events go, parsed from a `file://` or `fluent://` URL.
pub enum Endpoint {
    Stdout,
    Stderr,
    File(std::path::PathBuf),
    Fluent { host: String, port: u16, tag: String },
}

const DEFAULT_FLUENT_PORT: u16 = 24224;

pub fn parse_endpoint(raw: &str) -> Result<Endpoint> {
    if let Some(rest) = raw.strip_prefix("file://") {
        return match rest {
            "/dev/stdout" => Ok(Endpoint::Stdout),
            "/dev/stderr" => Ok(Endpoint::Stderr),
            path => Ok(Endpoint::File(std::path::PathBuf::from(path))),
        };
    }

    if let Some(rest) = raw.strip_prefix("fluent://") {
        let (authority, tag) = rest.split_once('/').unwrap_or((rest, ""));
        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid fluent port in {raw:?}")))?;
                (host.to_string(), port)
            }
            None => (authority.to_string(), DEFAULT_FLUENT_PORT),
        };
        if host.is_empty() {
            return Err(Error::Config(format!("missing fluent host in {raw:?}")));
        }
        return Ok(Endpoint::Fluent {
            host,
            port,
            tag: tag.to_string(),
        });
    }

    Err(Error::Config(format!("unsupported logging endpoint {raw:?}")))
}
