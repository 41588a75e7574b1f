//! End-to-end pipeline: interpret, build, execute, aggregate.

use std::sync::Arc;

use action_flow::{
    ArtifactStore, AutomationExecutor, BrowserDriver, ExecutionSettings, WebDriverClient,
};
use intent_interpreter::{
    AnthropicLanguageModel, FallbackLanguageModel, IntentInterpreter, LanguageModel,
    OpenAiLanguageModel,
};
use result_aggregator::{aggregate, Report};
use serde::{Deserialize, Serialize};
use strategy_builder::{BuilderConfig, Strategy, StrategyBuilder};
use testpilot_core_types::{Command, Intent, RunId};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::errors::PipelineError;

/// Interpretation and strategy without execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub intent: Intent,
    pub strategy: Strategy,
}

pub struct Pipeline {
    interpreter: IntentInterpreter,
    executor: AutomationExecutor,
    settings: ExecutionSettings,
    fast_mode: bool,
    permits: Arc<Semaphore>,
}

impl Pipeline {
    /// Wire the configured model providers and the W3C WebDriver client from `config`.
    pub fn new(config: &AppConfig) -> Result<Self, PipelineError> {
        let model = language_model(config)?;
        let driver = WebDriverClient::new(config.webdriver_config())
            .map_err(|err| PipelineError::Setup(err.to_string()))?;
        Ok(Self::with_components(Arc::new(model), Arc::new(driver), config))
    }

    pub fn with_components(
        model: Arc<dyn LanguageModel>,
        driver: Arc<dyn BrowserDriver>,
        config: &AppConfig,
    ) -> Self {
        Self {
            interpreter: IntentInterpreter::new(model, config.interpreter_config()),
            executor: AutomationExecutor::new(
                driver,
                ArtifactStore::new(config.browser.artifact_dir.clone()),
            ),
            settings: config.execution_settings(),
            fast_mode: config.pipeline.fast_mode,
            permits: Arc::new(Semaphore::new(config.pipeline.max_concurrent_runs.max(1))),
        }
    }

    /// Free invocation slots right now.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn run(&self, command: Command) -> Result<Report, PipelineError> {
        self.run_with_cancellation(command, &CancellationToken::new())
            .await
    }

    /// Run one invocation. Always yields a report once the command text
    /// is non-empty; a cancelled run reports its remaining steps skipped
    /// and is planned with the heuristic only.
    pub async fn run_with_cancellation(
        &self,
        command: Command,
        cancel: &CancellationToken,
    ) -> Result<Report, PipelineError> {
        let command = normalize(command)?;

        let _permit = tokio::select! {
            permit = self.permits.acquire() => Some(
                permit.map_err(|err| PipelineError::Setup(err.to_string()))?,
            ),
            _ = cancel.cancelled() => {
                debug!("cancelled while waiting for a run slot");
                None
            }
        };

        let run_id = RunId::new();
        info!(run_id = %run_id, "Starting test run");

        // A run cancelled before it started never reaches the model.
        let plan = self.plan(&command, cancel.is_cancelled()).await?;
        let settings = self.settings.clone().with_context(&command.context);
        let trace = self
            .executor
            .execute(&run_id, &plan.strategy, &settings, cancel)
            .await;
        let report = aggregate(&command, &plan.intent, &plan.strategy, trace);

        if report.success {
            info!(run_id = %run_id, duration_ms = report.total_duration_ms, "Test run passed");
        } else {
            warn!(
                run_id = %run_id,
                failed = report.summary.failed_steps,
                skipped = report.summary.skipped_steps,
                "Test run did not pass"
            );
        }
        Ok(report)
    }

    /// Interpret and build without opening a browser. `offline` skips the model.
    pub async fn plan(&self, command: &Command, offline: bool) -> Result<Plan, PipelineError> {
        let command = normalize(command.clone())?;
        let overrides = command.overrides();
        let intent = if offline {
            self.interpreter.interpret_offline(&command.text, &overrides)
        } else {
            self.interpreter.interpret(&command.text, &overrides).await
        };
        let builder = StrategyBuilder::new(BuilderConfig {
            fast_mode: self.fast_mode || command.fast_mode,
        });
        let strategy = builder.build(&intent);
        info!(
            platform = %intent.platform,
            test_type = %intent.test_type,
            confidence = intent.confidence,
            steps = strategy.steps.len(),
            "Strategy ready"
        );
        Ok(Plan { intent, strategy })
    }
}

/// Providers in fallback order: OpenAI, then Anthropic. Only providers
/// with a key take part; with no key at all OpenAI alone is kept so the
/// missing credentials surface in the logs.
pub fn language_model(config: &AppConfig) -> Result<FallbackLanguageModel, PipelineError> {
    let setup = |err: intent_interpreter::ModelError| PipelineError::Setup(err.to_string());
    let mut providers: Vec<Arc<dyn LanguageModel>> = Vec::new();
    if config.has_openai_key() || !config.has_anthropic_key() {
        providers.push(Arc::new(
            OpenAiLanguageModel::new(config.openai_config()).map_err(setup)?,
        ));
    }
    if config.has_anthropic_key() {
        providers.push(Arc::new(
            AnthropicLanguageModel::new(config.anthropic_config()).map_err(setup)?,
        ));
    }
    debug!(providers = providers.len(), "language model chain ready");
    Ok(FallbackLanguageModel::new(providers))
}

fn normalize(mut command: Command) -> Result<Command, PipelineError> {
    let trimmed = command.text.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::EmptyCommand);
    }
    if trimmed.len() != command.text.len() {
        command.text = trimmed.to_string();
    }
    Ok(command)
}
