use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde_json::json;

use ra_agent::{detect_mode, AgentController, AgentRequest, Mode};
use ra_github::GitHubClient;
use ra_llm::{build_generator, GeneratorConfig};
use ra_trace::logging::{self, LogFormat};
use ra_trace::{data, TraceStatus, TraceStore};

/// repo-agent -- run one repository-mutating agent request from the shell.
///
/// Reads backend selection from `AGENT_MODEL` plus the matching API key
/// variable, and the GitHub token from `GITHUB_TOKEN`.
#[derive(Parser)]
#[command(name = "repo-agent", version, about)]
struct Cli {
    /// The instruction, e.g. "fix the typo in https://github.com/acme/widgets".
    prompt: String,

    /// Force a mode instead of detecting one from the prompt.
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    mode: ModeArg,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long)]
    json_logs: bool,

    /// Print the finished trace document to stdout after the answer.
    #[arg(long)]
    emit_trace: bool,

    /// Override the step ceiling for the tool workflow.
    #[arg(long)]
    max_steps: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Auto,
    Chat,
    Plan,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    logging::init("repo-agent", "info", format);

    let config = GeneratorConfig::from_env().context("generator configuration")?;
    let generator = build_generator(&config);
    let client = GitHubClient::new_from_env().context("GitHub client configuration")?;

    let (mode, mode_reason) = match cli.mode {
        ModeArg::Chat => (Mode::Chat, "forced".to_string()),
        ModeArg::Plan => (Mode::Plan, "forced".to_string()),
        ModeArg::Auto => {
            let decision = detect_mode(&cli.prompt);
            (decision.mode, decision.reason)
        }
    };

    let store = TraceStore::new();
    let trace = store.create(data(json!({
        "channel": "cli",
        "mode": mode,
        "mode_reason": mode_reason,
    })));
    tracing::info!(request_id = %trace.request_id(), ?mode_reason, "request started");

    let mut controller = AgentController::new(generator, Arc::new(client));
    if let Some(max_steps) = cli.max_steps {
        controller = controller.with_max_steps(max_steps);
    }

    let request = AgentRequest::new(cli.prompt, mode);
    let result = controller.respond(&request, &trace).await;
    if let Err(err) = &result {
        trace
            .root()
            .finish(TraceStatus::Error, data(json!({ "error": err.to_string() })));
    }
    let document = store.persist(&trace);

    let response = result.context("agent request failed")?;
    println!("{}", response.text);

    if cli.emit_trace {
        println!("{}", serde_json::to_string_pretty(&document)?);
    }
    Ok(())
}
