use serde_json::Value;

/// Key fragments that mark a value as sensitive. Matching is case-insensitive
/// on the containing key.
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &["token", "authorization", "api_key", "secret"];

/// Replacement for redacted strings.
const REDACTED: &str = "[REDACTED]";

/// Strings longer than this are truncated in the serialized document.
const MAX_STRING_LEN: usize = 2000;

const TRUNCATION_SUFFIX: &str = "...[truncated]";

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

/// Replace every string inside `value` with the redaction marker, recursing
/// through maps and arrays. Applied to anything stored under a sensitive key.
fn redact_strings(value: &Value) -> Value {
    match value {
        Value::String(_) => Value::String(REDACTED.to_string()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_strings(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_strings).collect()),
        other => other.clone(),
    }
}

fn truncate(text: &str) -> Value {
    if text.chars().count() > MAX_STRING_LEN {
        let head: String = text.chars().take(MAX_STRING_LEN).collect();
        Value::String(format!("{head}{TRUNCATION_SUFFIX}"))
    } else {
        Value::String(text.to_string())
    }
}

/// Sanitize a value for inclusion in a trace document.
///
/// Any value stored under a key whose name case-insensitively contains one of
/// `token`, `authorization`, `api_key`, or `secret` has every string inside
/// it replaced with a fixed marker. All other strings are truncated to 2000
/// characters. Non-string leaves pass through unchanged.
///
/// This is purely presentational: the in-memory trace keeps the original
/// values, only serialization sees the sanitized form.
pub fn safe_value(value: &Value) -> Value {
    match value {
        Value::String(text) => truncate(text),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let sanitized = if is_sensitive_key(key) {
                        redact_strings(inner)
                    } else {
                        safe_value(inner)
                    };
                    (key.clone(), sanitized)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(safe_value).collect()),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
