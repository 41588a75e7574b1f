//! Core types for strategy execution

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strategy_builder::{Step, StepKind};
use testpilot_core_types::{BrowserKind, ExecutionContext, RunId};
use thiserror::Error;

/// Resolved settings for one browser session.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSettings {
    pub browser: BrowserKind,
    pub headless: bool,
    /// Upper bound for a single step, unless the step carries its own.
    pub step_timeout: Duration,
    /// Driver-side implicit wait when locating elements.
    pub implicit_wait: Duration,
    pub page_load_timeout: Duration,
    pub window_size: (u32, u32),
    /// Capture a best-effort screenshot after every non-screenshot step.
    pub screenshot_each_step: bool,
    /// Attempts per locate or interaction on transient driver errors.
    pub locate_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            headless: true,
            step_timeout: Duration::from_secs(10),
            implicit_wait: Duration::from_secs(3),
            page_load_timeout: Duration::from_secs(30),
            window_size: (1920, 1080),
            screenshot_each_step: false,
            locate_attempts: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl ExecutionSettings {
    /// Apply the per-command context on top of these settings.
    pub fn with_context(mut self, context: &ExecutionContext) -> Self {
        if let Some(browser) = context.browser {
            self.browser = browser;
        }
        if let Some(headless) = context.headless {
            self.headless = headless;
        }
        if let Some(timeout_ms) = context.timeout_ms.filter(|ms| *ms > 0) {
            self.step_timeout = Duration::from_millis(timeout_ms);
        }
        self
    }

    /// Bound applied to `step`. A template wait can tighten the step
    /// timeout but never extend it.
    pub fn timeout_for(&self, step: &Step) -> Duration {
        step.params
            .wait_ms
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::from_millis(ms).min(self.step_timeout))
            .unwrap_or(self.step_timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Success,
    Failure,
    Skipped,
}

/// Why a step did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StepError {
    #[error("timed out after {after_ms} ms: {action}")]
    Timeout { after_ms: u64, action: String },

    #[error("{0}")]
    Failed(String),

    #[error("skipped: prerequisite {0} did not succeed")]
    SkippedDependency(String),

    #[error("skipped: run cancelled")]
    Cancelled,

    #[error("session unavailable: {0}")]
    SessionUnavailable(String),
}

/// Recorded outcome of one step. Exactly one exists per strategy step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub kind: StepKind,
    pub description: String,
    pub outcome: StepOutcome,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    /// Path of the screenshot written for this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    pub element_found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_used: Option<String>,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl StepResult {
    /// Create a pending result; the outcome is set by one of the `with_*` methods.
    pub fn new(step: &Step) -> Self {
        Self {
            step_id: step.id.clone(),
            kind: step.kind,
            description: step.description.clone(),
            outcome: StepOutcome::Skipped,
            started_at: Utc::now(),
            duration_ms: 0,
            error: None,
            artifact: None,
            element_found: false,
            selector_used: None,
            attempts: 0,
            notes: Vec::new(),
        }
    }

    /// Result for a step that was never attempted.
    pub fn skipped(step: &Step, reason: StepError) -> Self {
        Self::new(step).with_skip(reason)
    }

    pub fn with_success(mut self) -> Self {
        self.outcome = StepOutcome::Success;
        self.error = None;
        self
    }

    pub fn with_error(mut self, error: StepError) -> Self {
        self.outcome = StepOutcome::Failure;
        self.error = Some(error);
        self
    }

    pub fn with_skip(mut self, reason: StepError) -> Self {
        self.outcome = StepOutcome::Skipped;
        self.error = Some(reason);
        self.attempts = 0;
        self.duration_ms = 0;
        self.artifact = None;
        self
    }

    pub fn with_element(mut self, selector_used: String) -> Self {
        self.element_found = true;
        self.selector_used = Some(selector_used);
        self
    }

    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifact = Some(path);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn finish(mut self, elapsed: Duration) -> Self {
        self.duration_ms = elapsed.as_millis() as u64;
        self
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == StepOutcome::Success
    }

    pub fn is_skipped(&self) -> bool {
        self.outcome == StepOutcome::Skipped
    }
}

/// Executor lifecycle, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    SessionOpen,
    StepRunning,
    StepDone,
    SessionClosed,
}

/// Everything the executor produced for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub run_id: RunId,
    pub step_results: Vec<StepResult>,
    /// Set when the session could not be opened or a step faulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_error: Option<String>,
    pub cancelled: bool,
    /// Final lifecycle phase; `SessionClosed` whenever a session was opened.
    pub final_phase: SessionPhase,
}

impl ExecutionTrace {
    pub fn artifacts(&self) -> impl Iterator<Item = &PathBuf> {
        self.step_results.iter().filter_map(|r| r.artifact.as_ref())
    }
}
