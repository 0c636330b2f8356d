use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use octocrab::Octocrab;
use serde_json::Value;
use thiserror::Error;

use crate::types::{GitHubConfig, NewPullRequest, RepoAccess, WriteFile};

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("missing GitHub token — set GITHUB_TOKEN or pass it in GitHubConfig")]
    MissingToken,

    #[error("token has no push access to {owner}/{repo} — grant write on Contents and Pull requests")]
    NoWriteAccess { owner: String, repo: String },

    #[error("ref heads/{0} has no resolvable commit sha")]
    MissingRefSha(String),

    #[error("file content at {0} is not valid base64-encoded UTF-8")]
    InvalidContent(String),

    #[error("environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

fn status_of(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

fn is_not_found(err: &octocrab::Error) -> bool {
    status_of(err) == Some(404)
}

fn is_ref_exists(err: &octocrab::Error) -> bool {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            source.status_code.as_u16() == 422 && source.message.contains("already exists")
        }
        _ => false,
    }
}

// Encode a repository path for a contents route, keeping `/` separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the contents-API PUT body for a file upsert.
///
/// The `sha` field is what tells the API this is an update of the blob it
/// identifies; it must be present exactly when the file already exists on
/// the target branch, and absent on a create.
fn write_file_body(input: &WriteFile, branch: &str, existing_sha: Option<&str>) -> Value {
    let mut body = serde_json::json!({
        "message": input.commit_message,
        "content": BASE64.encode(input.content.as_bytes()),
        "branch": branch,
    });
    if let Some(sha) = existing_sha {
        body["sha"] = Value::String(sha.to_string());
    }
    body
}

// ---------------------------------------------------------------------------
// GitHubClient
// ---------------------------------------------------------------------------

/// Executes repository operations over the GitHub REST API.
///
/// Holds no per-request state, so one client may serve many concurrent
/// requests; all request-scoped attribution (spans, history) lives with the
/// caller.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Create a client from an explicit [`GitHubConfig`].
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let token = config.token.ok_or(GitHubError::MissingToken)?;
        let octocrab = Octocrab::builder().personal_token(token).build()?;
        Ok(Self { octocrab })
    }

    /// Create a client by reading `GITHUB_TOKEN` from the environment.
    pub fn new_from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")?;
        Self::new(GitHubConfig { token: Some(token) })
    }

    async fn get_json(&self, route: String) -> Result<Value> {
        tracing::debug!(%route, "github GET");
        Ok(self.octocrab.get(route, None::<&()>).await?)
    }

    async fn repo_json(&self, access: &RepoAccess) -> Result<Value> {
        self.get_json(format!("/repos/{}/{}", access.owner, access.repo))
            .await
    }

    /// Verify the token can push to the repository. Called before any
    /// mutation is attempted so a read-only token fails fast.
    pub async fn ensure_write_access(&self, access: &RepoAccess) -> Result<()> {
        let repo = self.repo_json(access).await?;
        let can_push = repo["permissions"]["push"].as_bool().unwrap_or(true);
        if !can_push {
            tracing::warn!(owner = %access.owner, repo = %access.repo, "token lacks push access");
            return Err(GitHubError::NoWriteAccess {
                owner: access.owner.clone(),
                repo: access.repo.clone(),
            });
        }
        Ok(())
    }

    /// The repository's default branch, falling back to the access branch
    /// when the API omits it.
    pub async fn get_default_branch(&self, access: &RepoAccess) -> Result<String> {
        let repo = self.repo_json(access).await?;
        Ok(repo["default_branch"]
            .as_str()
            .unwrap_or(&access.branch)
            .to_string())
    }

    /// Create `new_branch` from the tip of `from_branch` (default branch
    /// when omitted). A branch that already exists from a previous run is
    /// treated as success.
    pub async fn create_branch(
        &self,
        access: &RepoAccess,
        new_branch: &str,
        from_branch: Option<&str>,
    ) -> Result<String> {
        let source = match from_branch {
            Some(branch) => branch.to_string(),
            None => self.get_default_branch(access).await?,
        };

        let source_ref = self
            .get_json(format!(
                "/repos/{}/{}/git/ref/heads/{}",
                access.owner,
                access.repo,
                urlencoding::encode(&source)
            ))
            .await?;
        let sha = source_ref["object"]["sha"]
            .as_str()
            .ok_or_else(|| GitHubError::MissingRefSha(source.clone()))?
            .to_string();

        let route = format!("/repos/{}/{}/git/refs", access.owner, access.repo);
        let body = serde_json::json!({
            "ref": format!("refs/heads/{new_branch}"),
            "sha": sha,
        });
        let created: std::result::Result<Value, octocrab::Error> =
            self.octocrab.post(route, Some(&body)).await;
        match created {
            Ok(_) => {}
            Err(err) if is_ref_exists(&err) => {
                tracing::debug!(branch = new_branch, "branch already exists, reusing");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(new_branch.to_string())
    }

    async fn tree_json(&self, access: &RepoAccess, reference: &str) -> Result<Value> {
        let route = format!(
            "/repos/{}/{}/git/trees/{}?recursive=1",
            access.owner,
            access.repo,
            urlencoding::encode(reference)
        );
        match self.get_json(route).await {
            Ok(tree) => Ok(tree),
            Err(GitHubError::Api(err)) if is_not_found(&err) => {
                let fallback = self.get_default_branch(access).await?;
                if fallback == reference {
                    return Err(err.into());
                }
                self.get_json(format!(
                    "/repos/{}/{}/git/trees/{}?recursive=1",
                    access.owner,
                    access.repo,
                    urlencoding::encode(&fallback)
                ))
                .await
            }
            Err(err) => Err(err),
        }
    }

    /// List blob paths in the full recursive tree of `branch` (access branch
    /// when omitted; missing refs fall back to the default branch).
    pub async fn list_files(
        &self,
        access: &RepoAccess,
        branch: Option<&str>,
    ) -> Result<Vec<String>> {
        let reference = branch.unwrap_or(&access.branch);
        let tree = self.tree_json(access, reference).await?;

        let files = tree["tree"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry["type"] == "blob")
                    .filter_map(|entry| entry["path"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(files)
    }

    async fn contents_json(
        &self,
        access: &RepoAccess,
        path: &str,
        reference: &str,
    ) -> std::result::Result<Value, octocrab::Error> {
        let route = format!(
            "/repos/{}/{}/contents/{}?ref={}",
            access.owner,
            access.repo,
            encode_path(path),
            urlencoding::encode(reference)
        );
        tracing::debug!(%route, "github GET");
        self.octocrab.get(route, None::<&()>).await
    }

    /// Fetch and decode a file. A missing ref falls back to the default
    /// branch before the error is surfaced.
    pub async fn read_file(
        &self,
        access: &RepoAccess,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String> {
        let reference = branch.unwrap_or(&access.branch);
        let data = match self.contents_json(access, path, reference).await {
            Ok(data) => data,
            Err(err) if is_not_found(&err) => {
                let fallback = self.get_default_branch(access).await?;
                self.contents_json(access, path, &fallback).await?
            }
            Err(err) => return Err(err.into()),
        };

        let encoded: String = data["content"]
            .as_str()
            .unwrap_or_default()
            .chars()
            .filter(|c| *c != '\n')
            .collect();
        if encoded.is_empty() {
            return Ok(String::new());
        }
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| GitHubError::InvalidContent(path.to_string()))?;
        String::from_utf8(bytes).map_err(|_| GitHubError::InvalidContent(path.to_string()))
    }

    /// Upsert a file and return the resulting commit sha.
    ///
    /// When the file already exists on the target branch its current sha is
    /// included so the API updates in place; a not-found means this is a
    /// create and the sha is omitted.
    pub async fn write_file(&self, access: &RepoAccess, input: &WriteFile) -> Result<String> {
        let branch = input.branch.as_deref().unwrap_or(&access.branch);

        let existing_sha = match self.contents_json(access, &input.path, branch).await {
            Ok(existing) => existing["sha"].as_str().map(str::to_string),
            Err(err) if is_not_found(&err) => None,
            Err(err) => return Err(err.into()),
        };

        let body = write_file_body(input, branch, existing_sha.as_deref());

        let route = format!(
            "/repos/{}/{}/contents/{}",
            access.owner,
            access.repo,
            encode_path(&input.path)
        );
        tracing::debug!(%route, update = body.get("sha").is_some(), "github PUT");
        let response: Value = self.octocrab.put(route, Some(&body)).await?;
        Ok(response["commit"]["sha"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    /// Open a pull request and return its canonical URL.
    pub async fn create_pull_request(
        &self,
        access: &RepoAccess,
        input: &NewPullRequest,
    ) -> Result<String> {
        let base = input.base_branch.as_deref().unwrap_or(&access.branch);
        let pr = self
            .octocrab
            .pulls(&access.owner, &access.repo)
            .create(&input.title, &input.head_branch, base)
            .body(&input.body)
            .send()
            .await?;
        Ok(pr.html_url.map(|url| url.to_string()).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
