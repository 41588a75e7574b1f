use std::sync::Arc;
use std::time::Duration;

use testpilot_core_types::{Intent, IntentOverrides, IntentSource, Platform, DEFAULT_INTENT_LABEL};
use tracing::{debug, info, warn};

use crate::errors::{InterpretationError, ModelError};
use crate::heuristic::{extract_target_url, heuristic_intent, keyword_confidence};
use crate::parse::{parse_model_intent, ModelIntent};
use crate::prompt::PromptBuilder;
use crate::provider::{ChatRequest, LanguageModel};
use crate::retry::{run_with_retry, RetryOutcome, RetryPolicy};

/// Knobs for the model path. Supplied by the caller, never read from the
/// environment here.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterConfig {
    /// Total model calls before falling back to the heuristic.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(60),
            max_tokens: 500,
            temperature: 0.3,
        }
    }
}

impl InterpreterConfig {
    /// No backoff; used by tests and offline planning.
    pub fn immediate() -> Self {
        Self {
            retry_delay: Duration::ZERO,
            max_retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay).with_max_delay(self.max_retry_delay)
    }
}

/// Turns command text into a typed [`Intent`].
pub struct IntentInterpreter {
    model: Arc<dyn LanguageModel>,
    prompt: PromptBuilder,
    config: InterpreterConfig,
}

impl IntentInterpreter {
    pub fn new(model: Arc<dyn LanguageModel>, config: InterpreterConfig) -> Self {
        Self {
            model,
            prompt: PromptBuilder::new(),
            config,
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Interpret `text`, honouring `overrides`. Model failures never
    /// escape: once the retry budget is spent the keyword heuristic
    /// answers instead.
    pub async fn interpret(&self, text: &str, overrides: &IntentOverrides) -> Intent {
        if let Some(intent) = overrides_only(text, overrides) {
            debug!("all intent fields overridden; skipping model");
            return intent;
        }

        match self.query_model(text).await {
            Ok(model_intent) => merge_model_intent(text, model_intent, overrides),
            Err(err) => {
                warn!(
                    model = self.model.name(),
                    attempts = err.attempts(),
                    error = %err,
                    "falling back to keyword heuristic"
                );
                heuristic_intent(text, overrides)
            }
        }
    }

    /// Interpret without calling the model.
    pub fn interpret_offline(&self, text: &str, overrides: &IntentOverrides) -> Intent {
        overrides_only(text, overrides).unwrap_or_else(|| heuristic_intent(text, overrides))
    }

    /// Run the model path alone with retry discipline.
    pub async fn query_model(&self, text: &str) -> Result<ModelIntent, InterpretationError> {
        let request = self
            .prompt
            .build(text, self.config.max_tokens, self.config.temperature);
        let request = &request;

        let outcome = run_with_retry(
            &self.config.retry_policy(),
            move |attempt| self.attempt_once(request, attempt),
            ModelError::is_transient,
        )
        .await;

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                info!(
                    model = self.model.name(),
                    attempts,
                    platform = %value.platform,
                    test_type = %value.test_type,
                    "intent interpreted by model"
                );
                Ok(value)
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => Err(InterpretationError::Exhausted {
                attempts,
                last: last_error,
            }),
            RetryOutcome::Aborted { error, attempts } => Err(InterpretationError::Unrecoverable {
                attempts,
                source: error,
            }),
        }
    }

    async fn attempt_once(
        &self,
        request: &ChatRequest,
        attempt: u32,
    ) -> Result<ModelIntent, ModelError> {
        debug!(model = self.model.name(), attempt = attempt + 1, "requesting intent");
        let raw = self.model.complete(request).await?;
        parse_model_intent(&raw)
    }
}

fn overrides_only(text: &str, overrides: &IntentOverrides) -> Option<Intent> {
    match (overrides.platform, overrides.test_type, overrides.priority) {
        (Some(platform), Some(test_type), Some(priority)) => Some(Intent {
            label: DEFAULT_INTENT_LABEL.to_string(),
            platform,
            test_type,
            priority,
            confidence: 1.0,
            source: IntentSource::Overrides,
            target_url: extract_target_url(text),
        }),
        _ => None,
    }
}

/// The model's own score covers the fields it inferred. When it gives no
/// score the keyword formula stands in, and an overridden platform earns
/// no platform-match credit.
fn merge_model_intent(text: &str, model: ModelIntent, overrides: &IntentOverrides) -> Intent {
    let scored_platform = match overrides.platform {
        Some(_) => Platform::Unknown,
        None => model.platform,
    };
    let confidence = model
        .confidence
        .unwrap_or_else(|| keyword_confidence(text, scored_platform));
    Intent {
        label: model.label,
        platform: overrides.platform.unwrap_or(model.platform),
        test_type: overrides.test_type.unwrap_or(model.test_type),
        priority: overrides.priority.unwrap_or(model.priority),
        confidence: confidence.clamp(0.0, 1.0),
        source: IntentSource::Model,
        target_url: extract_target_url(text),
    }
}
