use serde::{Deserialize, Serialize};

/// Credentials and default target, usually read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub token: Option<String>,
}

const URL_MARKER: &str = "https://github.com/";

fn is_slug_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

/// Normalize one owner/repo segment: trim whitespace and angle brackets,
/// drop a chat-style `|label` suffix, pull the slug out of a full URL, and
/// strip a trailing `.git`.
fn sanitize_slug(raw: &str, want_repo: bool) -> String {
    let mut cleaned = raw.trim().trim_matches(|c| c == '<' || c == '>').trim();
    if let Some((head, _)) = cleaned.split_once('|') {
        cleaned = head;
    }

    let mut owned;
    if let Some(position) = cleaned.find("github.com/") {
        let tail = &cleaned[position + "github.com/".len()..];
        let tail = tail.split(['?', '#']).next().unwrap_or(tail);
        let parts: Vec<&str> = tail.split('/').filter(|part| !part.is_empty()).collect();
        owned = match (want_repo, parts.as_slice()) {
            (false, [owner, ..]) => (*owner).to_string(),
            (true, [_, repo, ..]) => (*repo).to_string(),
            (true, [only]) => (*only).to_string(),
            _ => String::new(),
        };
    } else {
        owned = cleaned.to_string();
    }

    if let Some(stripped) = owned.strip_suffix(".git") {
        owned = stripped.to_string();
    }
    owned
}

// ---------------------------------------------------------------------------
// RepoAccess
// ---------------------------------------------------------------------------

/// The normalized `{owner, repo, branch}` triple identifying the target of
/// every repository operation. A value type: re-derived per request, never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoAccess {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepoAccess {
    /// Build an access value from possibly messy owner/repo text (angle
    /// brackets, full URLs, `.git` suffixes). Branch defaults to `main`.
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: sanitize_slug(owner, false),
            repo: sanitize_slug(repo, true),
            branch: "main".to_string(),
        }
    }

    /// Scan free text for a `https://github.com/{owner}/{repo}` reference.
    ///
    /// Angle-bracket wrapping (chat clients linkify URLs as `<url>` or
    /// `<url|label>`) is tolerated by treating the brackets as whitespace.
    pub fn find_in_text(text: &str) -> Option<Self> {
        let cleaned: String = text
            .chars()
            .map(|c| if c == '<' || c == '>' { ' ' } else { c })
            .collect();

        let position = cleaned.find(URL_MARKER)?;
        let tail = &cleaned[position + URL_MARKER.len()..];

        let owner: String = tail.chars().take_while(|c| is_slug_char(*c)).collect();
        let rest = tail.strip_prefix(owner.as_str())?;
        let rest = rest.strip_prefix('/')?;
        let repo: String = rest.chars().take_while(|c| is_slug_char(*c)).collect();

        if owner.is_empty() || repo.is_empty() {
            return None;
        }

        let repo = repo.strip_suffix(".git").unwrap_or(&repo).to_string();
        Some(Self {
            owner,
            repo,
            branch: "main".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tool inputs
// ---------------------------------------------------------------------------

/// Input to the `write_file` upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFile {
    pub path: String,
    pub content: String,
    pub commit_message: String,
    /// Target branch; defaults to the access branch.
    pub branch: Option<String>,
}

/// Input to `create_pull_request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPullRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub head_branch: String,
    /// Merge target; defaults to the access branch.
    pub base_branch: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plain_url() {
        let access = RepoAccess::find_in_text("fix bug in https://github.com/acme/widgets").unwrap();
        assert_eq!(access.owner, "acme");
        assert_eq!(access.repo, "widgets");
        assert_eq!(access.branch, "main");
    }

    #[test]
    fn strips_angle_brackets_and_label() {
        let access =
            RepoAccess::find_in_text("see <https://github.com/acme/widgets|widgets> please")
                .unwrap();
        assert_eq!(access.owner, "acme");
        assert_eq!(access.repo, "widgets");
    }

    #[test]
    fn strips_git_suffix() {
        let access = RepoAccess::find_in_text("clone https://github.com/acme/widgets.git now")
            .unwrap();
        assert_eq!(access.repo, "widgets");
    }

    #[test]
    fn ignores_url_paths_beyond_repo() {
        let access =
            RepoAccess::find_in_text("https://github.com/acme/widgets/pull/4 is ready").unwrap();
        assert_eq!(access.owner, "acme");
        assert_eq!(access.repo, "widgets");
    }

    #[test]
    fn no_url_means_none() {
        assert!(RepoAccess::find_in_text("what is a monad?").is_none());
        assert!(RepoAccess::find_in_text("https://github.com/ownerless").is_none());
        assert!(RepoAccess::find_in_text("https://gitlab.com/a/b").is_none());
    }

    #[test]
    fn new_sanitizes_full_urls() {
        let access = RepoAccess::new(
            "<https://github.com/acme/widgets>",
            "https://github.com/acme/widgets.git",
        );
        assert_eq!(access.owner, "acme");
        assert_eq!(access.repo, "widgets");
    }

    #[test]
    fn new_sanitizes_query_and_fragment() {
        let access = RepoAccess::new(
            "https://github.com/acme/widgets?tab=readme",
            "https://github.com/acme/widgets#readme",
        );
        assert_eq!(access.owner, "acme");
        assert_eq!(access.repo, "widgets");
    }

    #[test]
    fn new_keeps_plain_slugs() {
        let access = RepoAccess::new(" acme ", "widgets.git");
        assert_eq!(access.owner, "acme");
        assert_eq!(access.repo, "widgets");
    }
}
