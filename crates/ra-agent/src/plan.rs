//! Structured plan output for plan mode.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use ra_llm::extract::{extract_first_object, ExtractError};

/// One implementation step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    pub title: String,
    pub details: String,
}

/// The structured answer the model must produce in plan mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    pub objective: String,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub files_to_touch: Vec<String>,
    pub implementation_steps: Vec<PlanStep>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub test_plan: Vec<String>,
    #[serde(default)]
    pub rollback_plan: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("plan payload does not match schema: {0}")]
    Invalid(String),

    #[error("plan has no implementation steps")]
    NoSteps,
}

/// The JSON schema embedded in the plan-mode prompt.
pub fn plan_schema_json() -> String {
    let schema = schema_for!(Plan);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

/// Parse model output into a [`Plan`].
pub fn parse_plan(text: &str) -> Result<Plan, PlanError> {
    let (object, _trailing) = extract_first_object(text)?;
    let plan: Plan = serde_json::from_value(Value::Object(object))
        .map_err(|err| PlanError::Invalid(err.to_string()))?;
    if plan.implementation_steps.is_empty() {
        return Err(PlanError::NoSteps);
    }
    Ok(plan)
}

fn push_section(lines: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(format!("**{heading}**"));
    lines.extend(items.iter().map(|item| format!("- {item}")));
}

/// Render a plan as platform-neutral markdown.
pub fn render_plan(plan: &Plan) -> String {
    let mut lines = vec![
        "**Plan**".to_string(),
        format!("**Objective**: {}", plan.objective),
    ];
    push_section(&mut lines, "Assumptions", &plan.assumptions);
    push_section(&mut lines, "Files To Touch", &plan.files_to_touch);

    lines.push(String::new());
    lines.push("**Implementation Steps**".to_string());
    for (index, step) in plan.implementation_steps.iter().enumerate() {
        lines.push(format!("{}. {}: {}", index + 1, step.title, step.details));
    }

    push_section(&mut lines, "Risks", &plan.risks);
    push_section(&mut lines, "Test Plan", &plan.test_plan);
    push_section(&mut lines, "Rollback Plan", &plan.rollback_plan);
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_PLAN: &str = r#"{
        "objective": "Add rate limiting",
        "assumptions": ["single instance"],
        "files_to_touch": ["src/middleware.rs"],
        "implementation_steps": [
            {"title": "Add limiter", "details": "token bucket in middleware"},
            {"title": "Wire config", "details": "limit from env"}
        ],
        "risks": ["bursty clients see 429s"],
        "test_plan": ["unit test bucket refill"],
        "rollback_plan": ["revert the middleware commit"]
    }"#;

    #[test]
    fn parses_valid_plan() {
        let plan = parse_plan(VALID_PLAN).unwrap();
        assert_eq!(plan.objective, "Add rate limiting");
        assert_eq!(plan.implementation_steps.len(), 2);
    }

    #[test]
    fn optional_sections_default_to_empty() {
        let plan = parse_plan(
            r#"{"objective":"x","implementation_steps":[{"title":"t","details":"d"}]}"#,
        )
        .unwrap();
        assert!(plan.assumptions.is_empty());
        assert!(plan.rollback_plan.is_empty());
    }

    #[test]
    fn plan_without_steps_is_rejected() {
        let err = parse_plan(r#"{"objective":"x","implementation_steps":[]}"#).unwrap_err();
        assert!(matches!(err, PlanError::NoSteps));
    }

    #[test]
    fn missing_objective_is_invalid() {
        let err = parse_plan(r#"{"implementation_steps":[{"title":"t","details":"d"}]}"#)
            .unwrap_err();
        assert!(matches!(err, PlanError::Invalid(_)));
    }

    #[test]
    fn render_numbers_steps_and_skips_empty_sections() {
        let plan = parse_plan(
            r#"{"objective":"x","implementation_steps":[{"title":"a","details":"b"}]}"#,
        )
        .unwrap();
        let rendered = render_plan(&plan);
        assert!(rendered.contains("1. a: b"));
        assert!(!rendered.contains("Risks"));
    }

    #[test]
    fn schema_names_required_fields() {
        let schema = plan_schema_json();
        assert!(schema.contains("objective"));
        assert!(schema.contains("implementation_steps"));
    }
}
