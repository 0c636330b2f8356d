//! Request mode detection.
//!
//! A request either runs in chat mode (direct answer, or the tool workflow
//! when it names a repository) or plan mode (a single structured-plan
//! generation). The caller may force a mode; detection is the `auto`
//! heuristic.

use serde::{Deserialize, Serialize};

use crate::plan::plan_schema_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Chat,
    Plan,
}

/// The detected mode plus why, for trace metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeDecision {
    pub mode: Mode,
    pub reason: String,
}

/// Phrases that explicitly ask for a plan instead of changes.
const PLAN_HINTS: &[&str] = &[
    "plan mode",
    "make a plan",
    "create a plan",
    "before you code",
    "implementation plan",
    "review before coding",
];

/// Pick a mode for a raw request. Only explicit plan phrasing selects plan
/// mode; anything else goes through chat, where a repository reference still
/// routes into the tool workflow.
pub fn detect_mode(prompt: &str) -> ModeDecision {
    let normalized = prompt.trim().to_lowercase();
    for hint in PLAN_HINTS {
        if normalized.contains(hint) {
            return ModeDecision {
                mode: Mode::Plan,
                reason: format!("matched_hint:{hint}"),
            };
        }
    }
    ModeDecision {
        mode: Mode::Chat,
        reason: "default".to_string(),
    }
}

/// Wrap a user request in the plan-mode prompt: the model must answer with
/// JSON matching the plan schema, nothing else.
pub fn build_plan_prompt(user_prompt: &str) -> String {
    format!(
        "You are in plan mode. Analyze the request and return only JSON matching this schema. \
         Do not include markdown fences or commentary.\n\n\
         Schema:\n{}\n\n\
         User request:\n{}",
        plan_schema_json(),
        user_prompt
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
