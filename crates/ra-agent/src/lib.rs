//! The agent loop: plan/act against a remote repository.
//!
//! [`AgentController`] drives one request end to end. It detects a
//! repository reference in the instruction, verifies write access, then
//! alternates between asking the generation backend for the next [`Action`]
//! and executing that action through the tool dispatch [`registry`], with a
//! hard ceiling on iterations. Every step is mirrored into the request
//! trace.

mod action;
mod controller;
mod error;
pub mod modes;
pub mod plan;
mod prompt;
pub mod registry;

pub use action::{decode_action, Action, ActionError};
pub use controller::{
    AgentController, AgentRequest, AgentResponse, HistoryEntry, MAX_STEPS, STEP_LIMIT_MESSAGE,
};
pub use error::AgentError;
pub use modes::{detect_mode, Mode, ModeDecision};
pub use registry::{dispatch, ToolError};
