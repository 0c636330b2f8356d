use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from a text-generation backend.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The API returned a non-success status. Never retried — the backend
    /// has already made a decision about the request.
    #[error("provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// A transport-level failure (connection, DNS, TLS). Retry-eligible.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded its timeout. Retry-eligible.
    #[error("request timed out")]
    Timeout,

    /// The response arrived but carried no text content.
    #[error("response missing text content")]
    EmptyResponse,

    /// Backend selection or credential configuration failed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerateError::Timeout
        } else {
            GenerateError::Network(err.to_string())
        }
    }
}

impl GenerateError {
    /// Whether a fresh attempt could plausibly succeed. Only transport
    /// failures qualify; an error response with a status code is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerateError::Network(_) | GenerateError::Timeout)
    }
}

// ---------------------------------------------------------------------------
// Generator trait
// ---------------------------------------------------------------------------

/// A text-generation oracle: one prompt in, one completion out.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short backend name for trace metadata ("claude", "gpt", "gemini").
    fn name(&self) -> &str;

    /// Produce a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Claude,
    Gpt,
    Gemini,
}

impl GeneratorKind {
    fn parse(name: &str) -> Result<Self, GenerateError> {
        match name.trim().to_lowercase().as_str() {
            "claude" => Ok(GeneratorKind::Claude),
            "gpt" => Ok(GeneratorKind::Gpt),
            "gemini" => Ok(GeneratorKind::Gemini),
            other => Err(GenerateError::Config(format!(
                "unsupported generator: {other}"
            ))),
        }
    }
}

/// Backend selection plus credentials, usually read from the environment.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    pub api_key: String,
    /// Model identifier; `None` uses the backend default.
    pub model: Option<String>,
}

impl GeneratorConfig {
    /// Read configuration from `AGENT_MODEL` and the matching key variable
    /// (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, or `GEMINI_API_KEY`), with
    /// optional `CLAUDE_MODEL` / `GPT_MODEL` / `GEMINI_MODEL` overrides.
    pub fn from_env() -> Result<Self, GenerateError> {
        let name = std::env::var("AGENT_MODEL")
            .map_err(|_| GenerateError::Config("missing AGENT_MODEL".into()))?;
        let kind = GeneratorKind::parse(&name)?;

        let (key_var, model_var) = match kind {
            GeneratorKind::Claude => ("ANTHROPIC_API_KEY", "CLAUDE_MODEL"),
            GeneratorKind::Gpt => ("OPENAI_API_KEY", "GPT_MODEL"),
            GeneratorKind::Gemini => ("GEMINI_API_KEY", "GEMINI_MODEL"),
        };

        let api_key = std::env::var(key_var)
            .map_err(|_| GenerateError::Config(format!("missing {key_var} for AGENT_MODEL={name}")))?;

        Ok(Self {
            kind,
            api_key,
            model: std::env::var(model_var).ok(),
        })
    }
}

/// Build the configured backend. The single place the backend choice lives.
pub fn build_generator(config: &GeneratorConfig) -> Arc<dyn Generator> {
    match config.kind {
        GeneratorKind::Claude => Arc::new(crate::AnthropicGenerator::new(
            config.api_key.clone(),
            config.model.clone(),
        )),
        GeneratorKind::Gpt => Arc::new(crate::OpenAiGenerator::new(
            config.api_key.clone(),
            config.model.clone(),
        )),
        GeneratorKind::Gemini => Arc::new(crate::GeminiGenerator::new(
            config.api_key.clone(),
            config.model.clone(),
        )),
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

/// A scripted generator for tests.
///
/// Pops one queued result per call and captures every prompt for
/// assertions. An empty queue keeps returning the fallback text, which lets
/// loop-bound tests run an unbounded script.
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, GenerateError>>>,
    captured_prompts: Mutex<Vec<String>>,
    fallback: String,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            captured_prompts: Mutex::new(Vec::new()),
            fallback: "mock response".to_string(),
        }
    }

    /// Queue a successful completion.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    /// Queue an error.
    pub fn with_error(self, error: GenerateError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Text returned once the queue is exhausted.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = text.into();
        self
    }

    /// Prompts seen so far, in call order.
    pub fn captured_prompts(&self) -> Vec<String> {
        self.captured_prompts.lock().unwrap().clone()
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.captured_prompts.lock().unwrap().len()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        self.captured_prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(self.fallback.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
