//! Natural-language command interpretation.
//!
//! A [`LanguageModel`] is asked for a structured intent under a bounded
//! retry loop; when the loop fails the deterministic keyword heuristic
//! answers with low confidence, so interpretation itself never fails.

pub mod anthropic;
pub mod errors;
pub mod fallback;
pub mod heuristic;
pub mod interpreter;
pub mod openai;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod retry;

pub use anthropic::{AnthropicConfig, AnthropicLanguageModel};
pub use errors::{InterpretationError, ModelError};
pub use fallback::FallbackLanguageModel;
pub use heuristic::{heuristic_intent, HEURISTIC_CONFIDENCE_CAP};
pub use interpreter::{IntentInterpreter, InterpreterConfig};
pub use openai::{OpenAiConfig, OpenAiLanguageModel};
pub use parse::{extract_json_object, parse_model_intent, ModelIntent};
pub use prompt::{PromptBuilder, MAX_COMMAND_CHARS};
pub use provider::{ChatRequest, LanguageModel, ScriptedLanguageModel};
pub use retry::{run_with_retry, RetryOutcome, RetryPolicy};
