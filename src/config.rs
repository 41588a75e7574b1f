//! Application configuration
//!
//! Loaded from YAML, then overridden from the environment, then passed
//! explicitly to [`Pipeline::new`](crate::pipeline::Pipeline::new).

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use action_flow::{ExecutionSettings, WebDriverConfig, DEFAULT_ARTIFACT_DIR, DEFAULT_WEBDRIVER_URL};
use intent_interpreter::{AnthropicConfig, InterpreterConfig, OpenAiConfig};
use serde::{Deserialize, Serialize};
use testpilot_core_types::BrowserKind;

use crate::errors::ConfigError;

const REDACTED: &str = "***";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub browser: BrowserConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_retries: u32,
    /// Base retry delay in seconds.
    pub retry_delay: f64,
    /// Backoff ceiling in seconds.
    pub max_retry_delay: f64,
    pub request_timeout_secs: u64,
    /// Second provider, tried after OpenAI when a key is configured.
    pub anthropic: AnthropicLlmConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: intent_interpreter::openai::DEFAULT_API_BASE.to_string(),
            model: intent_interpreter::openai::DEFAULT_MODEL.to_string(),
            max_tokens: 500,
            temperature: 0.3,
            max_retries: 3,
            retry_delay: 1.0,
            max_retry_delay: 60.0,
            request_timeout_secs: 30,
            anthropic: AnthropicLlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicLlmConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

impl Default for AnthropicLlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: intent_interpreter::anthropic::DEFAULT_API_BASE.to_string(),
            model: intent_interpreter::anthropic::DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: BrowserKind,
    pub headless: bool,
    pub webdriver_url: String,
    pub step_timeout_ms: u64,
    pub implicit_wait_ms: u64,
    pub page_load_timeout_ms: u64,
    pub window_width: u32,
    pub window_height: u32,
    pub locate_attempts: u32,
    pub retry_backoff_ms: u64,
    pub screenshot_each_step: bool,
    pub artifact_dir: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chrome,
            headless: true,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            step_timeout_ms: 10_000,
            implicit_wait_ms: 3_000,
            page_load_timeout_ms: 30_000,
            window_width: 1920,
            window_height: 1080,
            locate_attempts: 2,
            retry_backoff_ms: 500,
            screenshot_each_step: false,
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Invocations beyond this bound wait for a free slot.
    pub max_concurrent_runs: usize,
    pub fast_mode: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 2,
            fast_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    pub fn from_yaml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw, path)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(base) = get("OPENAI_API_BASE") {
            self.llm.api_base = base;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(value) = get("OPENAI_MAX_TOKENS") {
            self.llm.max_tokens = parse_env("OPENAI_MAX_TOKENS", &value)?;
        }
        if let Some(value) = get("OPENAI_TEMPERATURE") {
            self.llm.temperature = parse_env("OPENAI_TEMPERATURE", &value)?;
        }
        if let Some(value) = get("OPENAI_MAX_RETRIES") {
            self.llm.max_retries = parse_env("OPENAI_MAX_RETRIES", &value)?;
        }
        if let Some(value) = get("OPENAI_RETRY_DELAY") {
            self.llm.retry_delay = parse_env("OPENAI_RETRY_DELAY", &value)?;
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.llm.anthropic.api_key = Some(key);
        }
        if let Some(base) = get("ANTHROPIC_API_BASE") {
            self.llm.anthropic.api_base = base;
        }
        if let Some(model) = get("ANTHROPIC_MODEL") {
            self.llm.anthropic.model = model;
        }
        if let Some(url) = get("TESTPILOT_WEBDRIVER_URL") {
            self.browser.webdriver_url = url;
        }
        if let Some(value) = get("TESTPILOT_MAX_CONCURRENT_RUNS") {
            self.pipeline.max_concurrent_runs = parse_env("TESTPILOT_MAX_CONCURRENT_RUNS", &value)?;
        }
        if let Some(dir) = get("TESTPILOT_ARTIFACT_DIR") {
            self.browser.artifact_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::invalid(format!(
                "llm.temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::invalid("llm.max_tokens must be positive"));
        }
        for (key, value) in [
            ("llm.retry_delay", self.llm.retry_delay),
            ("llm.max_retry_delay", self.llm.max_retry_delay),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(format!(
                    "{key} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        if self.pipeline.max_concurrent_runs == 0 {
            return Err(ConfigError::invalid(
                "pipeline.max_concurrent_runs must be at least 1",
            ));
        }
        if self.browser.step_timeout_ms == 0 {
            return Err(ConfigError::invalid("browser.step_timeout_ms must be positive"));
        }
        if self.browser.webdriver_url.trim().is_empty() {
            return Err(ConfigError::invalid("browser.webdriver_url is empty"));
        }
        Ok(())
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for key in [&mut copy.llm.api_key, &mut copy.llm.anthropic.api_key] {
            if key.is_some() {
                *key = Some(REDACTED.to_string());
            }
        }
        copy
    }

    pub fn interpreter_config(&self) -> InterpreterConfig {
        InterpreterConfig {
            max_retries: self.llm.max_retries,
            retry_delay: seconds(self.llm.retry_delay),
            max_retry_delay: seconds(self.llm.max_retry_delay),
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
        }
    }

    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_key: self.llm.api_key.clone(),
            model: self.llm.model.clone(),
            api_base: self.llm.api_base.clone(),
            timeout: Duration::from_secs(self.llm.request_timeout_secs),
        }
    }

    pub fn anthropic_config(&self) -> AnthropicConfig {
        let anthropic = &self.llm.anthropic;
        AnthropicConfig {
            api_key: anthropic.api_key.clone(),
            model: anthropic.model.clone(),
            api_base: anthropic.api_base.clone(),
            timeout: Duration::from_secs(self.llm.request_timeout_secs),
        }
    }

    /// Whether the provider has a non-blank key.
    pub fn has_openai_key(&self) -> bool {
        has_key(&self.llm.api_key)
    }

    pub fn has_anthropic_key(&self) -> bool {
        has_key(&self.llm.anthropic.api_key)
    }

    pub fn webdriver_config(&self) -> WebDriverConfig {
        WebDriverConfig {
            endpoint: self.browser.webdriver_url.clone(),
            ..WebDriverConfig::default()
        }
    }

    pub fn execution_settings(&self) -> ExecutionSettings {
        let browser = &self.browser;
        ExecutionSettings {
            browser: browser.kind,
            headless: browser.headless,
            step_timeout: Duration::from_millis(browser.step_timeout_ms),
            implicit_wait: Duration::from_millis(browser.implicit_wait_ms),
            page_load_timeout: Duration::from_millis(browser.page_load_timeout_ms),
            window_size: (browser.window_width, browser.window_height),
            screenshot_each_step: browser.screenshot_each_step,
            locate_attempts: browser.locate_attempts,
            retry_backoff: Duration::from_millis(browser.retry_backoff_ms),
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn has_key(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|key| !key.trim().is_empty())
}
