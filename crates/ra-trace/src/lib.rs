//! Hierarchical request tracing.
//!
//! One [`RequestTrace`] is created per inbound request. Work is recorded as a
//! tree of named, timed [`Span`]s with attached [`TraceEvent`]s. At the end of
//! the request the whole tree is serialized into a single JSON document with
//! secrets redacted, suitable for shipping to any log or storage backend.
//!
//! The trace is write-only instrumentation: it never fails and it never
//! influences control flow in the code it observes.

pub mod logging;
mod redact;
mod request;
mod span;

pub use redact::safe_value;
pub use request::{RequestTrace, TraceStore};
pub use span::{data, Data, Span, TraceEvent, TraceStatus};
