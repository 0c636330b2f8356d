//! Recover a single JSON object from free-form model output.
//!
//! Models asked for "only JSON" still wrap it in code fences, prepend prose,
//! or append commentary. The extractor strips an outer fence, scans for the
//! first top-level `{`, tracks brace depth while staying quote-aware (braces
//! and escaped quotes inside string values must not perturb the depth), and
//! parses the balanced candidate. Whatever follows the matching `}` is
//! returned verbatim for diagnostic logging.

use serde_json::{Map, Value};
use thiserror::Error;

/// Why extraction failed. All variants are terminal for the caller; nothing
/// here is retried.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No `{` outside of a quoted string anywhere in the text.
    #[error("no JSON object found in text")]
    NoObjectFound,

    /// An opening `{` was found but its depth never returned to zero.
    #[error("unterminated JSON object in text")]
    UnterminatedObject,

    /// The balanced candidate parsed, but to something other than an object
    /// (a bare array or scalar).
    #[error("top-level JSON payload must be an object")]
    NotAnObject,

    /// The balanced candidate is not valid JSON at all.
    #[error("malformed JSON object: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Strip a surrounding markdown code fence, if present.
///
/// Removes the first line when it starts with ``` (with or without a
/// language tag) and the last line when it is a bare closing fence.
pub fn strip_code_fences(text: &str) -> &str {
    let stripped = text.trim();
    if !stripped.starts_with("```") {
        return stripped;
    }

    let mut rest = stripped;
    if let Some(newline) = rest.find('\n') {
        rest = &rest[newline + 1..];
    } else {
        // A fence with no body.
        return "";
    }
    let rest = rest.trim_end();
    if let Some(body) = rest.strip_suffix("```") {
        body.trim()
    } else {
        rest.trim()
    }
}

/// Extract the first JSON object from `text`.
///
/// Returns the parsed object and everything after its closing brace,
/// trimmed. The trailing text is never semantically required — callers log
/// it as a diagnostic when a model keeps talking past its answer.
pub fn extract_first_object(text: &str) -> Result<(Map<String, Value>, String), ExtractError> {
    let candidate = strip_code_fences(text);

    let mut start = None;
    let mut end = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in candidate.char_indices() {
        if start.is_none() {
            // Quote tracking before the first brace keeps a `{` inside a
            // quoted preamble from being mistaken for the object start.
            match ch {
                '"' if !escaped => in_string = !in_string,
                '\\' if in_string => {
                    escaped = !escaped;
                    continue;
                }
                '{' if !in_string => {
                    start = Some(index);
                    depth = 1;
                }
                _ => {}
            }
            escaped = false;
            continue;
        }

        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(index);
                    break;
                }
            }
            _ => {}
        }
    }

    let start = start.ok_or(ExtractError::NoObjectFound)?;
    let end = end.ok_or(ExtractError::UnterminatedObject)?;

    let raw = &candidate[start..=end];
    // `}` is a single byte, so end + 1 is the start of the trailing text.
    let trailing = candidate[end + 1..].trim().to_string();

    let payload: Value = serde_json::from_str(raw)?;
    match payload {
        Value::Object(map) => Ok((map, trailing)),
        _ => Err(ExtractError::NotAnObject),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_plain_object() {
        let (object, trailing) = extract_first_object(r#"{"type":"final","message":"done"}"#)
            .unwrap();
        assert_eq!(object["type"], "final");
        assert_eq!(object["message"], "done");
        assert!(trailing.is_empty());
    }

    #[test]
    fn braces_and_quotes_inside_strings_do_not_break_depth() {
        let text = r#"{"message":"use {braces} and a \" quote and a } stray","n":1} tail text"#;
        let (object, trailing) = extract_first_object(text).unwrap();
        assert_eq!(
            object["message"],
            "use {braces} and a \" quote and a } stray"
        );
        assert_eq!(object["n"], 1);
        assert_eq!(trailing, "tail text");
    }

    #[test]
    fn nested_objects_round_trip() {
        let original = json!({
            "type": "tool_call",
            "tool": "write_file",
            "arguments": {"path": "a/b.rs", "content": "fn main() {}\n"}
        });
        let text = format!("noise before {} and after", original);
        let (object, trailing) = extract_first_object(&text).unwrap();
        assert_eq!(Value::Object(object), original);
        assert_eq!(trailing, "and after");
    }

    #[test]
    fn fenced_block_parses_like_unfenced() {
        let bare = r#"{"ok": true}"#;
        let fenced = format!("\n```json\n{bare}\n```\n");
        let (from_bare, _) = extract_first_object(bare).unwrap();
        let (from_fenced, _) = extract_first_object(&fenced).unwrap();
        assert_eq!(from_bare, from_fenced);
    }

    #[test]
    fn fence_without_language_tag() {
        let fenced = "```\n{\"a\": 1}\n```";
        let (object, _) = extract_first_object(fenced).unwrap();
        assert_eq!(object["a"], 1);
    }

    #[test]
    fn no_object_found() {
        let err = extract_first_object("just some prose").unwrap_err();
        assert!(matches!(err, ExtractError::NoObjectFound));
    }

    #[test]
    fn brace_inside_quoted_preamble_is_ignored() {
        let err = extract_first_object(r#"the token "{" is an open brace"#).unwrap_err();
        assert!(matches!(err, ExtractError::NoObjectFound));
    }

    #[test]
    fn unterminated_object() {
        let err = extract_first_object(r#"{"type": "final", "message": "oops"#).unwrap_err();
        assert!(matches!(err, ExtractError::UnterminatedObject));
    }

    #[test]
    fn balanced_but_invalid_json() {
        let err = extract_first_object("{not json}").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidJson(_)));
    }

    #[test]
    fn bare_array_is_rejected() {
        // The scan only starts at `{`, so an array body containing an object
        // yields that object; a pure array has no `{` at all.
        let err = extract_first_object("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ExtractError::NoObjectFound));
    }

    #[test]
    fn trailing_text_is_verbatim_after_trim() {
        let (_, trailing) =
            extract_first_object("{\"a\":1}\n\nI also want to mention: {unfinished").unwrap();
        assert_eq!(trailing, "I also want to mention: {unfinished");
    }
}
