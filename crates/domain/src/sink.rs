//! The event sink seam (C10): the pipeline and supervisor emit structured
//! events through this trait without knowing whether they end up on
//! stdout, a file, or a fluentd forwarder.

use std::collections::BTreeMap;

use serde_json::Value;

/// A single structured event. `fields` is a `BTreeMap` rather than a
/// `HashMap` so two sinks rendering the same event produce byte-identical
/// key ordering, which matters for the key-value renderer and for tests
/// that assert on exact output.
pub trait EventSink: Send + Sync {
    /// Emit `event` with `fields`. Implementations attach `@timestamp`
    /// themselves unless the caller already supplied one.
    fn info(&self, event: &str, fields: BTreeMap<String, Value>);
}

/// A sink that discards every event; used by tests that don't care about
/// the C10 stream.
pub struct NullSink;

impl EventSink for NullSink {
    fn info(&self, _event: &str, _fields: BTreeMap<String, Value>) {}
}
