//! Fluentd forward protocol v0 client: each event is one MessagePack
//! `[tag, timestamp_epoch, payload]` tuple written to a plain TCP stream.

use std::collections::BTreeMap;
use std::io::Write;
use std::net::TcpStream;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;

pub struct Forwarder {
    host: String,
    port: u16,
    tag: String,
    conn: Mutex<Option<TcpStream>>,
}

impl Forwarder {
    pub fn new(host: String, port: u16, tag: String) -> Self {
        Self {
            host,
            port,
            tag,
            conn: Mutex::new(None),
        }
    }

    /// Best-effort: a send that fails to connect or write is dropped
    /// rather than blocking the pipeline or HTTP handler that emitted it.
    pub fn send(&self, event: &str, mut fields: BTreeMap<String, Value>) {
        fields
            .entry("event".to_string())
            .or_insert_with(|| Value::String(event.to_string()));

        // Always UTC, independent of the process-wide --utc flag.
        let timestamp = Utc::now().timestamp();
        let record = (self.tag.clone(), timestamp, fields);

        let Ok(packed) = rmp_serde::to_vec(&record) else {
            return;
        };

        let mut guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };

        if guard.is_none() {
            *guard = TcpStream::connect((self.host.as_str(), self.port)).ok();
        }

        if let Some(stream) = guard.as_mut() {
            if stream.write_all(&packed).is_err() {
                *guard = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn send_writes_a_messagepack_tuple() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).unwrap();
            buf
        });

        let forwarder = Forwarder::new(addr.ip().to_string(), addr.port(), "smartmob".to_string());
        let mut fields = BTreeMap::new();
        fields.insert("slug".to_string(), Value::String("foo.web.0".to_string()));
        forwarder.send("pipeline.state", fields);
        drop(forwarder);

        let received = handle.join().unwrap();
        let value: rmpv::Value = rmp_serde::from_slice(&received).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array[0].as_str(), Some("smartmob"));
        assert!(array[1].as_i64().is_some());

        let payload = array[2].as_map().unwrap();
        let get = |key: &str| {
            payload
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v)
        };
        assert_eq!(get("slug").and_then(|v| v.as_str()), Some("foo.web.0"));
        assert_eq!(get("event").and_then(|v| v.as_str()), Some("pipeline.state"));
    }
}
