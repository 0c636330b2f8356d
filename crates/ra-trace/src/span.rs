use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::redact::safe_value;

/// Attached data for spans and events.
pub type Data = serde_json::Map<String, Value>;

/// Build a [`Data`] map from a `serde_json::json!` literal.
///
/// Object literals become the map directly; `null` becomes an empty map; any
/// other value is stored under a `"value"` key so malformed input never
/// panics inside instrumentation code.
pub fn data(value: Value) -> Data {
    match value {
        Value::Object(map) => map,
        Value::Null => Data::new(),
        other => {
            let mut map = Data::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

// ---------------------------------------------------------------------------
// TraceStatus
// ---------------------------------------------------------------------------

/// Status of a span or event.
///
/// Spans start in `InProgress` and finish as `Ok` or `Error`; events carry
/// any of the terminal statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    InProgress,
    Ok,
    Error,
    Warn,
    Info,
}

// ---------------------------------------------------------------------------
// TraceEvent
// ---------------------------------------------------------------------------

/// A discrete, timestamped occurrence attached to a span. Immutable once
/// created.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub name: String,
    pub status: TraceStatus,
    pub timestamp: DateTime<Utc>,
    pub data: Data,
}

impl TraceEvent {
    fn new(name: &str, status: TraceStatus, data: Data) -> Self {
        Self {
            name: name.to_string(),
            status,
            timestamp: Utc::now(),
            data,
        }
    }

    fn as_document(&self) -> Value {
        json!({
            "name": self.name,
            "status": self.status,
            "timestamp": self.timestamp.to_rfc3339(),
            "data": safe_value(&Value::Object(self.data.clone())),
        })
    }
}

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SpanNode {
    name: String,
    status: TraceStatus,
    started_at: DateTime<Utc>,
    started_instant: Instant,
    finished_at: Option<DateTime<Utc>>,
    duration_ms: Option<u64>,
    data: Data,
    events: Vec<TraceEvent>,
    children: Vec<Span>,
}

/// A named, timed unit of work in the trace tree.
///
/// `Span` is a cheap-clone handle; clones refer to the same node, so a span
/// can be handed to helper functions for event recording while the caller
/// keeps it for finishing. Duration is measured on a monotonic clock, so
/// wall-clock adjustments never skew it.
#[derive(Debug, Clone)]
pub struct Span {
    inner: Arc<Mutex<SpanNode>>,
}

impl Span {
    pub(crate) fn new(name: &str, data: Data) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SpanNode {
                name: name.to_string(),
                status: TraceStatus::InProgress,
                started_at: Utc::now(),
                started_instant: Instant::now(),
                finished_at: None,
                duration_ms: None,
                data,
                events: Vec::new(),
                children: Vec::new(),
            })),
        }
    }

    // Instrumentation must never panic; a poisoned lock just means another
    // thread panicked mid-record, and the partial node is still usable.
    fn lock(&self) -> MutexGuard<'_, SpanNode> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create a child span under this one and return its handle.
    pub fn child(&self, name: &str, data: Data) -> Span {
        let span = Span::new(name, data);
        self.lock().children.push(span.clone());
        span
    }

    /// Append a timestamped event. Does not alter the span's own status.
    pub fn event(&self, name: &str, status: TraceStatus, data: Data) {
        self.lock().events.push(TraceEvent::new(name, status, data));
    }

    /// Finish the span: freeze its status, record the finish time and
    /// duration, and merge `extra` into its data.
    ///
    /// Finishing is idempotent — a second call is a no-op and the first
    /// outcome is preserved.
    pub fn finish(&self, status: TraceStatus, extra: Data) {
        let mut node = self.lock();
        if node.finished_at.is_some() {
            return;
        }
        node.status = status;
        node.finished_at = Some(Utc::now());
        node.duration_ms = Some(node.started_instant.elapsed().as_millis() as u64);
        node.data.extend(extra);
    }

    /// Whether the span has been finished.
    pub fn is_finished(&self) -> bool {
        self.lock().finished_at.is_some()
    }

    /// Current status of the span.
    pub fn status(&self) -> TraceStatus {
        self.lock().status
    }

    /// Serialize this span and its subtree to a plain JSON document with
    /// redaction applied to all attached data.
    pub fn as_document(&self) -> Value {
        let node = self.lock();
        json!({
            "name": node.name,
            "status": node.status,
            "started_at": node.started_at.to_rfc3339(),
            "finished_at": node.finished_at.map(|t| t.to_rfc3339()),
            "duration_ms": node.duration_ms,
            "data": safe_value(&Value::Object(node.data.clone())),
            "events": node.events.iter().map(TraceEvent::as_document).collect::<Vec<_>>(),
            "children": node.children.iter().map(Span::as_document).collect::<Vec<_>>(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
