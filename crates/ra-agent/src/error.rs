use thiserror::Error;

use crate::action::ActionError;
use crate::registry::ToolError;
use ra_github::GitHubError;
use ra_llm::GenerateError;

/// Fatal workflow failures.
///
/// Everything here aborts the run and propagates to the caller; the step
/// limit is deliberately absent — running out of steps is a normal terminal
/// outcome, not an error.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The write-access precondition failed before the loop started.
    #[error("repository access check failed: {0}")]
    Access(#[source] GitHubError),

    /// The generation backend failed (after any retries it applies itself).
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// The model's output could not be decoded into an action.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Tool dispatch failed: unknown tool, bad arguments, or the repository
    /// operation itself.
    #[error(transparent)]
    Tool(#[from] ToolError),
}
