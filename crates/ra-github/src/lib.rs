//! GitHub repository mutation surface.
//!
//! [`RepoAccess`] normalizes user-supplied repository references,
//! [`GitHubClient`] executes the fixed set of repository operations over the
//! GitHub REST API, and [`RepoTools`] is the trait seam the agent loop (and
//! tests, through [`MockRepoTools`]) work against.

mod client;
mod tools;
mod types;

pub use client::{GitHubClient, GitHubError, Result};
pub use tools::{MockRepoTools, RecordedCall, RepoTools};
pub use types::{GitHubConfig, NewPullRequest, RepoAccess, WriteFile};
