use std::path::PathBuf;

use action_flow::StepResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strategy_builder::Strategy;
use testpilot_core_types::{Command, Intent, Platform, Priority, RunId, TestType};

/// Aggregate counts over the step results of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_steps: usize,
    pub succeeded_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    /// Succeeded over attempted steps, in [0, 1].
    pub success_rate: f64,
    /// Steps that located an element over all steps, in [0, 1].
    pub element_success_rate: f64,
    /// Mean duration of attempted steps.
    pub avg_step_duration_ms: u64,
    pub screenshots_taken: usize,
}

/// Final outcome of one pipeline invocation. Built once by
/// `aggregate` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub command: Command,
    pub intent: Intent,
    pub strategy: Strategy,
    /// One entry per strategy step, in step order.
    pub step_results: Vec<StepResult>,
    pub success: bool,
    /// Sum of per-step durations.
    pub total_duration_ms: u64,
    pub elements_found: usize,
    pub screenshots: Vec<PathBuf>,
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_error: Option<String>,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub parsed_intent: String,
    pub platform: Platform,
    pub test_type: TestType,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStrategySection {
    pub steps: Vec<String>,
    pub priority: Priority,
    /// Seconds.
    pub estimated_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationResults {
    pub success: bool,
    /// Seconds.
    pub test_duration: f64,
    pub elements_found: usize,
    pub screenshots: Vec<String>,
}

/// JSON document handed to callers and the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireReport {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub command: String,
    pub ai_analysis: AiAnalysis,
    pub test_strategy: TestStrategySection,
    pub automation_results: AutomationResults,
    pub summary: ReportSummary,
    pub step_results: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_error: Option<String>,
    pub cancelled: bool,
}

impl Report {
    pub fn to_wire(&self) -> WireReport {
        WireReport {
            run_id: self.run_id.clone(),
            created_at: self.created_at,
            command: self.command.text.clone(),
            ai_analysis: AiAnalysis {
                parsed_intent: self.intent.label.clone(),
                platform: self.intent.platform,
                test_type: self.intent.test_type,
                confidence: self.intent.confidence,
            },
            test_strategy: TestStrategySection {
                steps: self.strategy.step_descriptions(),
                priority: self.strategy.priority,
                estimated_time: self.strategy.estimated_secs(),
            },
            automation_results: AutomationResults {
                success: self.success,
                test_duration: self.total_duration_ms as f64 / 1000.0,
                elements_found: self.elements_found,
                screenshots: self
                    .screenshots
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect(),
            },
            summary: self.summary.clone(),
            step_results: self.step_results.clone(),
            session_error: self.session_error.clone(),
            cancelled: self.cancelled,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.to_wire())
    }
}
