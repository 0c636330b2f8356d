use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use ra_github::{RepoAccess, RepoTools};
use ra_llm::Generator;
use ra_trace::{data, Data, RequestTrace, Span, TraceStatus};

use crate::action::{decode_action, Action};
use crate::error::AgentError;
use crate::modes::Mode;
use crate::plan::{parse_plan, render_plan};
use crate::prompt::build_tool_prompt;
use crate::registry::dispatch;

/// Hard ceiling on plan/act iterations per workflow.
pub const MAX_STEPS: usize = 12;

/// Advisory returned when the ceiling is reached without a final action.
/// A normal terminal outcome, not a failure.
pub const STEP_LIMIT_MESSAGE: &str = "I couldn't complete the workflow within the step limit.";

/// One inbound instruction.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    pub mode: Mode,
}

impl AgentRequest {
    pub fn new(prompt: impl Into<String>, mode: Mode) -> Self {
        Self {
            prompt: prompt.into(),
            mode,
        }
    }
}

/// One executed tool call: the raw model text that requested it and the
/// result handed back. Appended in step order; final actions never append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub assistant_text: String,
    pub tool_result: Value,
}

/// The terminal result of a workflow.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub provider: String,
    pub text: String,
    /// The executed tool calls, in order. Empty for direct answers.
    pub history: Vec<HistoryEntry>,
}

// Finish a span with the error and hand the error back, so failure paths
// stay one-liners.
fn fail_span(span: &Span, err: AgentError) -> AgentError {
    span.finish(
        TraceStatus::Error,
        data(json!({ "error": err.to_string() })),
    );
    err
}

// ---------------------------------------------------------------------------
// AgentController
// ---------------------------------------------------------------------------

/// Drives one request end to end: mode handling, repository detection,
/// access check, then the bounded plan/act loop.
///
/// Owns no request state — history and trace both live on the stack of
/// [`respond`], so one controller can serve concurrent requests.
///
/// [`respond`]: AgentController::respond
pub struct AgentController {
    generator: Arc<dyn Generator>,
    tools: Arc<dyn RepoTools>,
    max_steps: usize,
}

impl AgentController {
    pub fn new(generator: Arc<dyn Generator>, tools: Arc<dyn RepoTools>) -> Self {
        Self {
            generator,
            tools,
            max_steps: MAX_STEPS,
        }
    }

    /// Override the step ceiling (mainly for tests).
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Process one request, mirroring every externally observable step into
    /// `trace`. On failure the workflow span is finished with `error` and
    /// the error propagates for the caller to render.
    pub async fn respond(
        &self,
        request: &AgentRequest,
        trace: &RequestTrace,
    ) -> Result<AgentResponse, AgentError> {
        let workflow = trace.span(
            "agent.workflow",
            data(json!({
                "provider": self.generator.name(),
                "mode": request.mode,
            })),
        );

        match self.respond_inner(request, &workflow).await {
            Ok(response) => Ok(response),
            Err(err) => Err(fail_span(&workflow, err)),
        }
    }

    async fn respond_inner(
        &self,
        request: &AgentRequest,
        workflow: &Span,
    ) -> Result<AgentResponse, AgentError> {
        if request.mode == Mode::Plan {
            return self.respond_plan(request, workflow).await;
        }

        let Some(access) = RepoAccess::find_in_text(&request.prompt) else {
            // No repository named: a single direct generation, no tools, no
            // history.
            let text = self
                .generate_in_span(workflow, &request.prompt)
                .await?;
            workflow.finish(TraceStatus::Ok, data(json!({ "outcome": "direct_answer" })));
            return Ok(self.response(text, Vec::new()));
        };

        workflow.event(
            "repo.detected",
            TraceStatus::Info,
            data(json!({ "owner": access.owner, "repo": access.repo })),
        );

        // Mutations need a pushable token; a read-only one fails the whole
        // request here, before any loop step runs.
        let check = workflow.child(
            "repo.access_check",
            data(json!({ "owner": access.owner, "repo": access.repo })),
        );
        match self.tools.ensure_write_access(&access).await {
            Ok(()) => {
                tracing::info!(owner = %access.owner, repo = %access.repo, "write access verified");
                check.finish(TraceStatus::Ok, Data::new());
            }
            Err(err) => return Err(fail_span(&check, AgentError::Access(err))),
        }

        self.run_loop(request, &access, workflow).await
    }

    async fn respond_plan(
        &self,
        request: &AgentRequest,
        workflow: &Span,
    ) -> Result<AgentResponse, AgentError> {
        let prompt = crate::modes::build_plan_prompt(&request.prompt);
        let raw = self.generate_in_span(workflow, &prompt).await?;

        let validate = workflow.child("plan.validate", Data::new());
        let text = match parse_plan(&raw) {
            Ok(plan) => {
                validate.finish(TraceStatus::Ok, Data::new());
                render_plan(&plan)
            }
            Err(err) => {
                // Not fatal: the user still gets the model's answer, the
                // trace records that it missed the schema.
                validate.finish(
                    TraceStatus::Error,
                    data(json!({ "error": err.to_string() })),
                );
                workflow.event(
                    "plan.validation.failed",
                    TraceStatus::Warn,
                    data(json!({ "error": err.to_string() })),
                );
                format!(
                    "A plan was requested, but the response did not match the plan schema. \
                     Raw model output below:\n\n{raw}"
                )
            }
        };

        workflow.finish(TraceStatus::Ok, data(json!({ "outcome": "plan" })));
        Ok(self.response(text, Vec::new()))
    }

    async fn run_loop(
        &self,
        request: &AgentRequest,
        access: &RepoAccess,
        workflow: &Span,
    ) -> Result<AgentResponse, AgentError> {
        let mut history: Vec<HistoryEntry> = Vec::new();

        for step_index in 1..=self.max_steps {
            let step = workflow.child("agent.step", data(json!({ "index": step_index })));
            let prompt = build_tool_prompt(&request.prompt, access, &history);

            let model_text = match self.generate_in_span(&step, &prompt).await {
                Ok(text) => text,
                Err(err) => return Err(fail_span(&step, err)),
            };

            let (action, trailing) = match decode_action(&model_text) {
                Ok(decoded) => decoded,
                Err(err) => {
                    step.event(
                        "action.decode_failed",
                        TraceStatus::Error,
                        data(json!({ "error": err.to_string(), "raw": model_text })),
                    );
                    return Err(fail_span(&step, err.into()));
                }
            };
            if !trailing.is_empty() {
                step.event(
                    "action.trailing_text",
                    TraceStatus::Warn,
                    data(json!({ "trailing": trailing })),
                );
            }

            match action {
                Action::Final { message } => {
                    step.finish(TraceStatus::Ok, data(json!({ "action_type": "final" })));
                    workflow.finish(
                        TraceStatus::Ok,
                        data(json!({ "outcome": "tool_workflow", "steps": step_index })),
                    );
                    return Ok(self.response(message, history));
                }
                Action::ToolCall { tool, arguments } => {
                    let tool_span = step.child(
                        "agent.tool_call",
                        data(json!({
                            "tool": tool,
                            "arguments": Value::Object(arguments.clone()),
                        })),
                    );
                    let tool_result =
                        match dispatch(self.tools.as_ref(), access, &tool, &arguments, &tool_span)
                            .await
                        {
                            Ok(result) => {
                                tool_span.finish(TraceStatus::Ok, Data::new());
                                result
                            }
                            Err(err) => {
                                let err = fail_span(&tool_span, AgentError::Tool(err));
                                return Err(fail_span(&step, err));
                            }
                        };

                    history.push(HistoryEntry {
                        assistant_text: model_text,
                        tool_result,
                    });
                    step.finish(TraceStatus::Ok, data(json!({ "action_type": "tool_call" })));
                }
            }
        }

        // Resource exhaustion, not failure: the caller gets a fixed advisory
        // and the trace records why the loop stopped.
        tracing::warn!(max_steps = self.max_steps, "step limit reached without a final action");
        workflow.finish(
            TraceStatus::Error,
            data(json!({ "reason": "step_limit_exceeded" })),
        );
        Ok(self.response(STEP_LIMIT_MESSAGE.to_string(), history))
    }

    async fn generate_in_span(
        &self,
        parent: &Span,
        prompt: &str,
    ) -> Result<String, AgentError> {
        let span = parent.child(
            "generation",
            data(json!({ "provider": self.generator.name() })),
        );
        match self.generator.generate(prompt).await {
            Ok(text) => {
                span.finish(TraceStatus::Ok, data(json!({ "text_length": text.len() })));
                Ok(text)
            }
            Err(err) => Err(fail_span(&span, err.into())),
        }
    }

    fn response(&self, text: String, history: Vec<HistoryEntry>) -> AgentResponse {
        AgentResponse {
            provider: self.generator.name().to_string(),
            text,
            history,
        }
    }
}
