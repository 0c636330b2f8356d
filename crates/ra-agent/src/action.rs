use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use ra_llm::extract::{extract_first_object, ExtractError};

/// The decoded intent of one loop iteration.
///
/// A closed sum type: the generation backend must answer with exactly one of
/// these shapes, and any other tag is a decode error rather than a silent
/// default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Invoke a named tool with a (possibly empty) argument mapping.
    ToolCall {
        tool: String,
        #[serde(default)]
        arguments: Map<String, Value>,
    },
    /// Terminate the workflow with a summary for the user.
    Final { message: String },
}

/// Why a model response could not be turned into an [`Action`]. Always fatal
/// to the workflow, never just to the step.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("response is not a JSON action: {0}")]
    Extract(#[from] ExtractError),

    /// The object parsed but is not a valid action shape (unknown `type`
    /// tag, missing `tool`, wrong field types).
    #[error("unsupported action payload: {0}")]
    Invalid(String),

    #[error("final action carried an empty message")]
    EmptyFinalMessage,
}

/// Decode a model response into an action.
///
/// Returns the action and any trailing text found after the JSON object —
/// diagnostic only, some models keep talking past their answer.
pub fn decode_action(model_text: &str) -> Result<(Action, String), ActionError> {
    let (object, trailing) = extract_first_object(model_text)?;

    let action: Action = serde_json::from_value(Value::Object(object))
        .map_err(|err| ActionError::Invalid(err.to_string()))?;

    if let Action::Final { message } = &action {
        if message.trim().is_empty() {
            return Err(ActionError::EmptyFinalMessage);
        }
    }
    Ok((action, trailing))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
