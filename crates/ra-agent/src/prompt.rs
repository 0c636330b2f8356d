//! Prompt assembly for the tool workflow.

use chrono::Utc;
use serde_json::json;

use crate::controller::HistoryEntry;
use ra_github::RepoAccess;

/// Standing instructions for the tool workflow: the action vocabulary, the
/// argument shape of every tool, and the expected working order.
pub const SYSTEM_INSTRUCTIONS: &str = "You are an autonomous software agent. \
You must output only valid JSON with one of these shapes:\n\
1) {\"type\":\"tool_call\",\"tool\":\"<name>\",\"arguments\":{...}}\n\
2) {\"type\":\"final\",\"message\":\"<final summary for user>\"}\n\n\
Available tools:\n\
- get_default_branch: {}\n\
- create_branch: {new_branch: string, from_branch?: string}\n\
- list_files: {branch?: string}\n\
- read_file: {path: string, branch?: string}\n\
- write_file: {path: string, content: string, commit_message: string, branch?: string}\n\
- create_pull_request: {title: string, body?: string, head_branch: string, base_branch?: string}\n\n\
Workflow guidance:\n\
1) Discover files\n\
2) Read relevant files\n\
3) Create a branch if needed\n\
4) Write updated file contents\n\
5) Open PR\n\
When done, return a final summary including PR URL.\n\
Never include markdown code fences.";

/// Serialize one loop iteration's full context into a single prompt string.
///
/// The model sees the standing instructions, the target repository, the
/// original request, and the complete history of executed tool calls; each
/// step's prompt therefore depends on everything that came before it.
pub fn build_tool_prompt(
    user_prompt: &str,
    access: &RepoAccess,
    history: &[HistoryEntry],
) -> String {
    json!({
        "system": SYSTEM_INSTRUCTIONS,
        "repo": access,
        "request": user_prompt,
        "history": history,
        "timestamp": Utc::now().timestamp(),
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn access() -> RepoAccess {
        RepoAccess::new("acme", "widgets")
    }

    #[test]
    fn prompt_is_valid_json_with_all_sections() {
        let prompt = build_tool_prompt("fix the bug", &access(), &[]);
        let parsed: Value = serde_json::from_str(&prompt).unwrap();

        assert_eq!(parsed["request"], "fix the bug");
        assert_eq!(parsed["repo"]["owner"], "acme");
        assert_eq!(parsed["repo"]["repo"], "widgets");
        assert_eq!(parsed["repo"]["branch"], "main");
        assert!(parsed["system"].as_str().unwrap().contains("tool_call"));
        assert!(parsed["history"].as_array().unwrap().is_empty());
        assert!(parsed["timestamp"].is_i64());
    }

    #[test]
    fn history_appears_in_step_order() {
        let history = vec![
            HistoryEntry {
                assistant_text: "{\"type\":\"tool_call\",\"tool\":\"list_files\"}".to_string(),
                tool_result: json!({"total_files": 3}),
            },
            HistoryEntry {
                assistant_text: "{\"type\":\"tool_call\",\"tool\":\"read_file\"}".to_string(),
                tool_result: json!({"path": "a.rs"}),
            },
        ];
        let prompt = build_tool_prompt("fix", &access(), &history);
        let parsed: Value = serde_json::from_str(&prompt).unwrap();

        let entries = parsed["history"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0]["assistant_text"]
            .as_str()
            .unwrap()
            .contains("list_files"));
        assert_eq!(entries[1]["tool_result"]["path"], "a.rs");
    }

    #[test]
    fn instructions_cover_every_tool() {
        for tool in crate::registry::TOOL_NAMES {
            assert!(
                SYSTEM_INSTRUCTIONS.contains(tool),
                "system instructions missing {tool}"
            );
        }
    }
}
