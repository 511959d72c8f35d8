//! The concrete C10 sinks: a stream/file renderer (kv or json) and a
//! fluentd forwarder, both behind the [`EventSink`] trait.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Mutex;

use chrono::{Local, Utc};
use serde_json::Value;

use smartmob_domain::{EventSink, Result};

use super::forwarder::Forwarder;
use super::Endpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Kv,
    Json,
}

enum Backend {
    Stream {
        writer: Mutex<Box<dyn Write + Send>>,
        format: LogFormat,
    },
    Forwarder(Forwarder),
}

/// The sink wired up at startup from [`super::parse_endpoint`].
pub struct Sink {
    backend: Backend,
    /// `--utc`: render local-sink timestamps in UTC too. The forwarder
    /// path always uses UTC regardless of this flag.
    force_utc: bool,
}

impl Sink {
    pub fn connect(endpoint: Endpoint, format: LogFormat, force_utc: bool) -> Result<Self> {
        let backend = match endpoint {
            Endpoint::Stdout => Backend::Stream {
                writer: Mutex::new(Box::new(std::io::stdout())),
                format,
            },
            Endpoint::Stderr => Backend::Stream {
                writer: Mutex::new(Box::new(std::io::stderr())),
                format,
            },
            Endpoint::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)?;
                Backend::Stream {
                    writer: Mutex::new(Box::new(file)),
                    format,
                }
            }
            Endpoint::Fluent { host, port, tag } => Backend::Forwarder(Forwarder::new(host, port, tag)),
        };
        Ok(Self { backend, force_utc })
    }

    fn timestamp(&self) -> String {
        if self.force_utc {
            Utc::now().to_rfc3339()
        } else {
            Local::now().to_rfc3339()
        }
    }

    fn render_kv(event: &str, fields: &BTreeMap<String, Value>) -> String {
        let mut line = format!("event={event}");
        for (key, value) in fields {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            line.push(' ');
            line.push_str(&format!("{key}={rendered}"));
        }
        line
    }

    fn render_json(event: &str, fields: &BTreeMap<String, Value>) -> String {
        let mut object = serde_json::Map::new();
        object.insert("event".to_string(), Value::String(event.to_string()));
        for (key, value) in fields {
            object.insert(key.clone(), value.clone());
        }
        serde_json::to_string(&Value::Object(object)).unwrap_or_default()
    }
}

impl EventSink for Sink {
    fn info(&self, event: &str, mut fields: BTreeMap<String, Value>) {
        fields
            .entry("@timestamp".to_string())
            .or_insert_with(|| Value::String(self.timestamp()));

        match &self.backend {
            Backend::Stream { writer, format } => {
                let rendered = match format {
                    LogFormat::Kv => Self::render_kv(event, &fields),
                    LogFormat::Json => Self::render_json(event, &fields),
                };
                if let Ok(mut writer) = writer.lock() {
                    let _ = writeln!(writer, "{rendered}");
                }
            }
            Backend::Forwarder(forwarder) => {
                // Always UTC here regardless of `force_utc`: fluentd's forward
                // protocol carries an epoch second, not a rendered string.
                forwarder.send(event, fields);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartmob_domain::EventSink;

    #[test]
    fn kv_render_includes_event_and_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("slug".to_string(), Value::String("foo.web.0".to_string()));
        fields.insert("state".to_string(), Value::String("downloading".to_string()));
        let line = Sink::render_kv("pipeline.state", &fields);
        assert!(line.starts_with("event=pipeline.state"));
        assert!(line.contains("slug=foo.web.0"));
        assert!(line.contains("state=downloading"));
    }

    #[test]
    fn json_render_is_valid_json_with_event_field() {
        let mut fields = BTreeMap::new();
        fields.insert("path".to_string(), Value::String("/list-processes".to_string()));
        let line = Sink::render_json("http.access", &fields);
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "http.access");
        assert_eq!(parsed["path"], "/list-processes");
    }

    #[test]
    fn caller_supplied_timestamp_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let sink = Sink::connect(Endpoint::File(path.clone()), LogFormat::Json, false).unwrap();

        let mut fields = BTreeMap::new();
        fields.insert(
            "@timestamp".to_string(),
            Value::String("2020-01-01T00:00:00Z".to_string()),
        );
        sink.info("custom", fields);

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed["@timestamp"], "2020-01-01T00:00:00Z");
    }

    #[test]
    fn force_utc_stamps_a_utc_offset() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::connect(Endpoint::File(dir.path().join("utc.log")), LogFormat::Json, true).unwrap();
        assert!(sink.timestamp().ends_with("+00:00"));
    }

    #[test]
    fn default_stamps_the_local_offset() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::connect(Endpoint::File(dir.path().join("local.log")), LogFormat::Json, false).unwrap();
        let expected_offset = Local::now().offset().to_string();
        assert!(sink.timestamp().ends_with(&expected_offset));
    }
}
