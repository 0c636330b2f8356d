use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::{GitHubClient, GitHubError, Result};
use crate::types::{NewPullRequest, RepoAccess, WriteFile};

// ---------------------------------------------------------------------------
// RepoTools trait
// ---------------------------------------------------------------------------

/// The repository-mutation seam the agent loop works against.
///
/// [`GitHubClient`] is the production implementation; [`MockRepoTools`]
/// serves scripted results in tests. Implementations hold no per-request
/// state — request-scoped attribution belongs to the caller.
#[async_trait]
pub trait RepoTools: Send + Sync {
    async fn ensure_write_access(&self, access: &RepoAccess) -> Result<()>;
    async fn get_default_branch(&self, access: &RepoAccess) -> Result<String>;
    async fn create_branch(
        &self,
        access: &RepoAccess,
        new_branch: &str,
        from_branch: Option<&str>,
    ) -> Result<String>;
    async fn list_files(&self, access: &RepoAccess, branch: Option<&str>) -> Result<Vec<String>>;
    async fn read_file(
        &self,
        access: &RepoAccess,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String>;
    async fn write_file(&self, access: &RepoAccess, input: &WriteFile) -> Result<String>;
    async fn create_pull_request(
        &self,
        access: &RepoAccess,
        input: &NewPullRequest,
    ) -> Result<String>;
}

#[async_trait]
impl RepoTools for GitHubClient {
    async fn ensure_write_access(&self, access: &RepoAccess) -> Result<()> {
        GitHubClient::ensure_write_access(self, access).await
    }

    async fn get_default_branch(&self, access: &RepoAccess) -> Result<String> {
        GitHubClient::get_default_branch(self, access).await
    }

    async fn create_branch(
        &self,
        access: &RepoAccess,
        new_branch: &str,
        from_branch: Option<&str>,
    ) -> Result<String> {
        GitHubClient::create_branch(self, access, new_branch, from_branch).await
    }

    async fn list_files(&self, access: &RepoAccess, branch: Option<&str>) -> Result<Vec<String>> {
        GitHubClient::list_files(self, access, branch).await
    }

    async fn read_file(
        &self,
        access: &RepoAccess,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String> {
        GitHubClient::read_file(self, access, path, branch).await
    }

    async fn write_file(&self, access: &RepoAccess, input: &WriteFile) -> Result<String> {
        GitHubClient::write_file(self, access, input).await
    }

    async fn create_pull_request(
        &self,
        access: &RepoAccess,
        input: &NewPullRequest,
    ) -> Result<String> {
        GitHubClient::create_pull_request(self, access, input).await
    }
}

// ---------------------------------------------------------------------------
// MockRepoTools
// ---------------------------------------------------------------------------

/// One recorded tool invocation, for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub args: Value,
}

/// An in-memory [`RepoTools`] for tests: serves a scripted file tree and
/// records every call in order.
pub struct MockRepoTools {
    default_branch: String,
    write_access: bool,
    files: Vec<String>,
    contents: HashMap<String, String>,
    pull_request_url: String,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRepoTools {
    pub fn new() -> Self {
        Self {
            default_branch: "main".to_string(),
            write_access: true,
            files: Vec::new(),
            contents: HashMap::new(),
            pull_request_url: "https://github.com/acme/widgets/pull/4".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    pub fn with_content(mut self, path: &str, content: &str) -> Self {
        self.contents.insert(path.to_string(), content.to_string());
        self
    }

    pub fn with_write_access(mut self, allowed: bool) -> Self {
        self.write_access = allowed;
        self
    }

    pub fn with_default_branch(mut self, branch: &str) -> Self {
        self.default_branch = branch.to_string();
        self
    }

    /// Calls seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &str, args: Value) {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            args,
        });
    }
}

impl Default for MockRepoTools {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoTools for MockRepoTools {
    async fn ensure_write_access(&self, access: &RepoAccess) -> Result<()> {
        self.record("ensure_write_access", json!({"owner": access.owner}));
        if self.write_access {
            Ok(())
        } else {
            Err(GitHubError::NoWriteAccess {
                owner: access.owner.clone(),
                repo: access.repo.clone(),
            })
        }
    }

    async fn get_default_branch(&self, _access: &RepoAccess) -> Result<String> {
        self.record("get_default_branch", json!({}));
        Ok(self.default_branch.clone())
    }

    async fn create_branch(
        &self,
        _access: &RepoAccess,
        new_branch: &str,
        from_branch: Option<&str>,
    ) -> Result<String> {
        self.record(
            "create_branch",
            json!({"new_branch": new_branch, "from_branch": from_branch}),
        );
        Ok(new_branch.to_string())
    }

    async fn list_files(&self, _access: &RepoAccess, branch: Option<&str>) -> Result<Vec<String>> {
        self.record("list_files", json!({"branch": branch}));
        Ok(self.files.clone())
    }

    async fn read_file(
        &self,
        _access: &RepoAccess,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String> {
        self.record("read_file", json!({"path": path, "branch": branch}));
        Ok(self.contents.get(path).cloned().unwrap_or_default())
    }

    async fn write_file(&self, _access: &RepoAccess, input: &WriteFile) -> Result<String> {
        self.record(
            "write_file",
            json!({
                "path": input.path,
                "commit_message": input.commit_message,
                "branch": input.branch,
                "update": self.contents.contains_key(&input.path),
            }),
        );
        Ok("0000000000000000000000000000000000000000".to_string())
    }

    async fn create_pull_request(
        &self,
        _access: &RepoAccess,
        input: &NewPullRequest,
    ) -> Result<String> {
        self.record(
            "create_pull_request",
            json!({
                "title": input.title,
                "head_branch": input.head_branch,
                "base_branch": input.base_branch,
            }),
        );
        Ok(self.pull_request_url.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn access() -> RepoAccess {
        RepoAccess::new("acme", "widgets")
    }

    #[tokio::test]
    async fn mock_records_calls_in_order() {
        let tools = MockRepoTools::new().with_files(vec!["a.rs".into()]);
        tools.ensure_write_access(&access()).await.unwrap();
        tools.list_files(&access(), None).await.unwrap();

        let calls = tools.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, "ensure_write_access");
        assert_eq!(calls[1].method, "list_files");
    }

    #[tokio::test]
    async fn mock_denies_write_access_when_configured() {
        let tools = MockRepoTools::new().with_write_access(false);
        let err = tools.ensure_write_access(&access()).await.unwrap_err();
        assert!(matches!(err, GitHubError::NoWriteAccess { .. }));
    }

    #[tokio::test]
    async fn mock_serves_scripted_content() {
        let tools = MockRepoTools::new().with_content("src/lib.rs", "pub fn f() {}");
        let content = tools.read_file(&access(), "src/lib.rs", None).await.unwrap();
        assert_eq!(content, "pub fn f() {}");
        let missing = tools.read_file(&access(), "nope.rs", None).await.unwrap();
        assert!(missing.is_empty());
    }
}
