//! Text-generation backends and output recovery.
//!
//! The rest of the system talks to a generation oracle through the
//! [`Generator`] trait: one prompt in, one text completion out. Concrete
//! backends (Anthropic, OpenAI, Gemini) are swappable implementations
//! selected by configuration, plus a queue-backed [`MockGenerator`] for
//! tests.
//!
//! The [`extract`] module recovers a single JSON object from the free-form,
//! possibly fenced text those backends produce.

mod anthropic;
pub mod extract;
mod gemini;
mod generator;
mod openai;
pub mod retry;

pub use anthropic::AnthropicGenerator;
pub use gemini::GeminiGenerator;
pub use generator::{
    build_generator, GenerateError, Generator, GeneratorConfig, GeneratorKind, MockGenerator,
};
pub use openai::OpenAiGenerator;
