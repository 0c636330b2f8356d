//! Tool dispatch: validate arguments, execute against [`RepoTools`], shape
//! the result for the model.
//!
//! The tool set is fixed. A name outside it is fatal to the whole workflow —
//! one bad decision from the oracle aborts the run rather than being
//! silently retried.

use serde_json::{json, Map, Value};
use thiserror::Error;

use ra_github::{GitHubError, NewPullRequest, RepoAccess, RepoTools, WriteFile};
use ra_trace::{data, Span, TraceStatus};

/// The fixed tool vocabulary offered to the model.
pub const TOOL_NAMES: &[&str] = &[
    "get_default_branch",
    "create_branch",
    "list_files",
    "read_file",
    "write_file",
    "create_pull_request",
];

/// `list_files` results are capped to keep the prompt payload controlled;
/// the true total is always reported alongside.
pub const LIST_FILES_CAP: usize = 500;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Fatal to the workflow: the model asked for something outside the
    /// fixed tool set.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: missing required field `{field}`")]
    InvalidArguments { tool: String, field: String },

    #[error(transparent)]
    Github(#[from] GitHubError),
}

fn require_str<'a>(
    arguments: &'a Map<String, Value>,
    tool: &str,
    field: &str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.to_string(),
            field: field.to_string(),
        })
}

fn optional_str<'a>(arguments: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    arguments.get(field).and_then(Value::as_str)
}

/// Execute one named tool against the repository.
///
/// `span` is the active trace span for this dispatch, passed explicitly per
/// call so concurrent requests can never cross-attribute each other's tool
/// activity.
pub async fn dispatch(
    tools: &dyn RepoTools,
    access: &RepoAccess,
    tool: &str,
    arguments: &Map<String, Value>,
    span: &Span,
) -> Result<Value, ToolError> {
    let result = match tool {
        "get_default_branch" => {
            let branch = tools.get_default_branch(access).await?;
            json!({ "default_branch": branch })
        }

        "create_branch" => {
            let new_branch = require_str(arguments, tool, "new_branch")?;
            let from_branch = optional_str(arguments, "from_branch");
            let created = tools.create_branch(access, new_branch, from_branch).await?;
            json!({ "branch": created })
        }

        "list_files" => {
            let branch = optional_str(arguments, "branch");
            let files = tools.list_files(access, branch).await?;
            let total = files.len();
            span.event(
                "tool.list_files",
                TraceStatus::Info,
                data(json!({ "total_files": total, "capped": total > LIST_FILES_CAP })),
            );
            json!({
                "files": files.into_iter().take(LIST_FILES_CAP).collect::<Vec<_>>(),
                "total_files": total,
            })
        }

        "read_file" => {
            let path = require_str(arguments, tool, "path")?;
            let branch = optional_str(arguments, "branch");
            let content = tools.read_file(access, path, branch).await?;
            json!({ "path": path, "content": content })
        }

        "write_file" => {
            let input = WriteFile {
                path: require_str(arguments, tool, "path")?.to_string(),
                content: arguments
                    .get("content")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ToolError::InvalidArguments {
                        tool: tool.to_string(),
                        field: "content".to_string(),
                    })?
                    .to_string(),
                commit_message: require_str(arguments, tool, "commit_message")?.to_string(),
                branch: optional_str(arguments, "branch").map(str::to_string),
            };
            let commit_sha = tools.write_file(access, &input).await?;
            json!({ "path": input.path, "commit_sha": commit_sha })
        }

        "create_pull_request" => {
            let input = NewPullRequest {
                title: require_str(arguments, tool, "title")?.to_string(),
                body: optional_str(arguments, "body").unwrap_or_default().to_string(),
                head_branch: require_str(arguments, tool, "head_branch")?.to_string(),
                base_branch: optional_str(arguments, "base_branch").map(str::to_string),
            };
            let url = tools.create_pull_request(access, &input).await?;
            json!({ "pull_request_url": url })
        }

        other => return Err(ToolError::UnknownTool(other.to_string())),
    };

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ra_github::MockRepoTools;
    use ra_trace::Data;

    fn access() -> RepoAccess {
        RepoAccess::new("acme", "widgets")
    }

    fn span() -> Span {
        let trace = ra_trace::TraceStore::new().create(Data::new());
        trace.span("test", Data::new())
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let tools = MockRepoTools::new();
        let err = dispatch(&tools, &access(), "delete_repo", &Map::new(), &span())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "delete_repo"));
    }

    #[tokio::test]
    async fn missing_argument_names_the_field() {
        let tools = MockRepoTools::new();
        let err = dispatch(&tools, &access(), "create_branch", &Map::new(), &span())
            .await
            .unwrap_err();
        match err {
            ToolError::InvalidArguments { tool, field } => {
                assert_eq!(tool, "create_branch");
                assert_eq!(field, "new_branch");
            }
            other => panic!("expected InvalidArguments, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn validation_happens_before_execution() {
        let tools = MockRepoTools::new();
        let _ = dispatch(&tools, &access(), "write_file", &Map::new(), &span()).await;
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn list_files_caps_results_but_reports_total() {
        let files: Vec<String> = (0..650).map(|i| format!("src/file_{i}.rs")).collect();
        let tools = MockRepoTools::new().with_files(files);

        let result = dispatch(&tools, &access(), "list_files", &Map::new(), &span())
            .await
            .unwrap();
        assert_eq!(result["files"].as_array().unwrap().len(), LIST_FILES_CAP);
        assert_eq!(result["total_files"], 650);
    }

    #[tokio::test]
    async fn write_file_accepts_empty_content() {
        let tools = MockRepoTools::new();
        let arguments = args(json!({
            "path": ".gitkeep",
            "content": "",
            "commit_message": "add placeholder",
        }));
        let result = dispatch(&tools, &access(), "write_file", &arguments, &span())
            .await
            .unwrap();
        assert_eq!(result["path"], ".gitkeep");
        assert!(result["commit_sha"].is_string());
    }

    #[tokio::test]
    async fn pull_request_body_defaults_to_empty() {
        let tools = MockRepoTools::new();
        let arguments = args(json!({
            "title": "Fix parser",
            "head_branch": "fix/parser",
        }));
        let result = dispatch(&tools, &access(), "create_pull_request", &arguments, &span())
            .await
            .unwrap();
        assert!(result["pull_request_url"]
            .as_str()
            .unwrap()
            .starts_with("https://github.com/"));

        let calls = tools.calls();
        assert_eq!(calls[0].method, "create_pull_request");
        assert_eq!(calls[0].args["base_branch"], Value::Null);
    }

    #[tokio::test]
    async fn read_file_passes_branch_through() {
        let tools = MockRepoTools::new().with_content("README.md", "# hello");
        let arguments = args(json!({ "path": "README.md", "branch": "dev" }));
        let result = dispatch(&tools, &access(), "read_file", &arguments, &span())
            .await
            .unwrap();
        assert_eq!(result["content"], "# hello");
        assert_eq!(tools.calls()[0].args["branch"], "dev");
    }
}
