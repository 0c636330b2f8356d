use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::redact::safe_value;
use crate::span::{Data, Span, TraceStatus};

// ---------------------------------------------------------------------------
// RequestTrace
// ---------------------------------------------------------------------------

/// The trace for one inbound request: a request id, free-form metadata, and a
/// root span the rest of the request hangs off.
#[derive(Debug, Clone)]
pub struct RequestTrace {
    request_id: Uuid,
    started_at: DateTime<Utc>,
    metadata: Data,
    root: Span,
}

impl RequestTrace {
    fn new(metadata: Data) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            metadata,
            root: Span::new("request.lifecycle", Data::new()),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The root span, for finishing with a terminal status on failure paths.
    pub fn root(&self) -> &Span {
        &self.root
    }

    /// Create a child span directly under the root.
    pub fn span(&self, name: &str, data: Data) -> Span {
        self.root.child(name, data)
    }

    /// Record an event on the root span.
    pub fn event(&self, name: &str, status: TraceStatus, data: Data) {
        self.root.event(name, status, data);
    }

    /// Serialize the whole trace to its transport document.
    pub fn as_document(&self) -> Value {
        json!({
            "request_id": self.request_id.to_string(),
            "started_at": self.started_at.to_rfc3339(),
            "metadata": safe_value(&Value::Object(self.metadata.clone())),
            "trace": self.root.as_document(),
        })
    }
}

// ---------------------------------------------------------------------------
// TraceStore
// ---------------------------------------------------------------------------

/// Creates request traces and hands finished documents to the logging layer.
///
/// The store itself keeps nothing: the document returned from [`persist`] is
/// the sole exported artifact, and the caller decides where it goes.
///
/// [`persist`]: TraceStore::persist
#[derive(Debug, Clone, Default)]
pub struct TraceStore;

impl TraceStore {
    pub fn new() -> Self {
        Self
    }

    /// Start a trace for a new request.
    pub fn create(&self, metadata: Data) -> RequestTrace {
        RequestTrace::new(metadata)
    }

    /// Finalize a trace and return its document.
    ///
    /// If the root span is still open it is finished with `ok`; a root
    /// already finished (for example with `error`) keeps its outcome. The
    /// document is also emitted through `tracing` so any subscriber can ship
    /// it without the caller doing anything.
    pub fn persist(&self, trace: &RequestTrace) -> Value {
        if !trace.root.is_finished() {
            trace.root.finish(TraceStatus::Ok, Data::new());
        }
        let document = trace.as_document();
        tracing::info!(
            target: "ra_trace::document",
            request_id = %trace.request_id,
            document = %document,
            "request trace persisted"
        );
        document
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::data;

    #[test]
    fn document_has_expected_shape() {
        let store = TraceStore::new();
        let trace = store.create(data(serde_json::json!({"channel": "cli"})));
        let span = trace.span("step", Data::new());
        span.finish(TraceStatus::Ok, Data::new());

        let doc = store.persist(&trace);
        assert_eq!(doc["request_id"], trace.request_id().to_string());
        assert!(doc["started_at"].is_string());
        assert_eq!(doc["metadata"]["channel"], "cli");
        assert_eq!(doc["trace"]["name"], "request.lifecycle");
        assert_eq!(doc["trace"]["children"][0]["name"], "step");
    }

    #[test]
    fn persist_auto_finishes_open_root() {
        let store = TraceStore::new();
        let trace = store.create(Data::new());
        assert!(!trace.root().is_finished());

        let doc = store.persist(&trace);
        assert!(trace.root().is_finished());
        assert_eq!(doc["trace"]["status"], "ok");
        assert!(doc["trace"]["finished_at"].is_string());
    }

    #[test]
    fn persist_keeps_error_outcome() {
        let store = TraceStore::new();
        let trace = store.create(Data::new());
        trace
            .root()
            .finish(TraceStatus::Error, data(serde_json::json!({"error": "boom"})));

        let doc = store.persist(&trace);
        assert_eq!(doc["trace"]["status"], "error");
        assert_eq!(doc["trace"]["data"]["error"], "boom");
    }

    #[test]
    fn metadata_is_redacted_in_document() {
        let store = TraceStore::new();
        let trace = store.create(data(serde_json::json!({"bot_token": "xoxb-1"})));
        let doc = store.persist(&trace);
        assert_eq!(doc["metadata"]["bot_token"], "[REDACTED]");
    }
}
