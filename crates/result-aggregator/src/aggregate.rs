use action_flow::{ExecutionTrace, StepResult};
use chrono::Utc;
use strategy_builder::Strategy;
use testpilot_core_types::{Command, Intent};
use tracing::{debug, warn};

use crate::model::{Report, ReportSummary};

/// Merge interpreter output, strategy and execution trace into a report.
///
/// The run succeeds only if every attempted step succeeded, at least
/// one step was attempted and the session reported no error.
pub fn aggregate(
    command: &Command,
    intent: &Intent,
    strategy: &Strategy,
    trace: ExecutionTrace,
) -> Report {
    if trace.step_results.len() != strategy.steps.len() {
        warn!(
            results = trace.step_results.len(),
            steps = strategy.steps.len(),
            "step result count does not match strategy"
        );
    }

    let summary = summarize(&trace.step_results);
    let success = trace.session_error.is_none() && overall_success(&trace.step_results);
    let total_duration_ms = trace.step_results.iter().map(|r| r.duration_ms).sum();
    let elements_found = trace.step_results.iter().filter(|r| r.element_found).count();
    let screenshots = trace.artifacts().cloned().collect();

    debug!(
        run_id = %trace.run_id,
        success,
        total_duration_ms,
        elements_found,
        "report assembled"
    );

    Report {
        run_id: trace.run_id,
        created_at: Utc::now(),
        command: command.clone(),
        intent: intent.clone(),
        strategy: strategy.clone(),
        step_results: trace.step_results,
        success,
        total_duration_ms,
        elements_found,
        screenshots,
        cancelled: trace.cancelled,
        session_error: trace.session_error,
        summary,
    }
}

/// Logical AND over attempted steps; false when nothing was attempted.
pub fn overall_success(results: &[StepResult]) -> bool {
    let mut attempted = results.iter().filter(|r| !r.is_skipped()).peekable();
    attempted.peek().is_some() && attempted.all(StepResult::succeeded)
}

pub fn summarize(results: &[StepResult]) -> ReportSummary {
    let total_steps = results.len();
    let succeeded_steps = results.iter().filter(|r| r.succeeded()).count();
    let skipped_steps = results.iter().filter(|r| r.is_skipped()).count();
    let failed_steps = total_steps - succeeded_steps - skipped_steps;
    let attempted = total_steps - skipped_steps;

    let ratio = |part: usize, whole: usize| {
        if whole == 0 {
            0.0
        } else {
            part as f64 / whole as f64
        }
    };
    let attempted_ms: u64 = results
        .iter()
        .filter(|r| !r.is_skipped())
        .map(|r| r.duration_ms)
        .sum();

    ReportSummary {
        total_steps,
        succeeded_steps,
        failed_steps,
        skipped_steps,
        success_rate: ratio(succeeded_steps, attempted),
        element_success_rate: ratio(
            results.iter().filter(|r| r.element_found).count(),
            total_steps,
        ),
        avg_step_duration_ms: if attempted == 0 {
            0
        } else {
            attempted_ms / attempted as u64
        },
        screenshots_taken: results.iter().filter(|r| r.artifact.is_some()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::StepError;
    use action_flow::SessionPhase;
    use strategy_builder::{Step, StepKind, StepParams};
    use testpilot_core_types::{IntentSource, Platform, Priority, RunId, TestType};

    fn step(id: &str) -> Step {
        Step {
            id: id.into(),
            kind: StepKind::Navigate,
            description: id.into(),
            target: None,
            params: StepParams::default(),
            depends_on: None,
            optional: false,
        }
    }

    #[test]
    fn all_skipped_is_not_success() {
        let results = vec![
            StepResult::skipped(&step("step-01"), StepError::Cancelled),
            StepResult::skipped(&step("step-02"), StepError::Cancelled),
        ];
        assert!(!overall_success(&results));
        assert!(!overall_success(&[]));
    }

    #[test]
    fn skipped_steps_do_not_count_against_success() {
        let results = vec![
            StepResult::new(&step("step-01")).with_success(),
            StepResult::skipped(&step("step-02"), StepError::SkippedDependency("x".into())),
        ];
        assert!(overall_success(&results));

        let summary = summarize(&results);
        assert_eq!(summary.succeeded_steps, 1);
        assert_eq!(summary.skipped_steps, 1);
        assert_eq!(summary.failed_steps, 0);
        assert_eq!(summary.success_rate, 1.0);
    }

    #[test]
    fn averages_cover_attempted_steps_only() {
        let results = vec![
            StepResult::new(&step("step-01"))
                .with_success()
                .finish(std::time::Duration::from_millis(300)),
            StepResult::new(&step("step-02"))
                .with_error(StepError::Failed("boom".into()))
                .finish(std::time::Duration::from_millis(100)),
            StepResult::skipped(&step("step-03"), StepError::Cancelled),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.avg_step_duration_ms, 200);
        assert_eq!(summary.success_rate, 0.5);
        assert!(!overall_success(&results));
    }

    #[test]
    fn faulted_session_fails_the_report() {
        let steps = vec![step("step-01"), step("step-02")];
        let strategy = Strategy {
            platform: Platform::Unknown,
            test_type: TestType::Functional,
            priority: Priority::Medium,
            base_url: "https://example.org".into(),
            estimated_duration_ms: strategy_builder::estimate_duration_ms(&steps),
            steps: steps.clone(),
            fast_mode: false,
        };
        let intent = Intent {
            label: "test_platform".into(),
            platform: Platform::Unknown,
            test_type: TestType::Functional,
            priority: Priority::Medium,
            confidence: 0.9,
            source: IntentSource::Model,
            target_url: None,
        };
        let trace = ExecutionTrace {
            run_id: RunId::new(),
            step_results: vec![
                StepResult::new(&steps[0]).with_success(),
                StepResult::skipped(&steps[1], StepError::Failed("executor fault".into())),
            ],
            session_error: Some("executor fault".into()),
            cancelled: false,
            final_phase: SessionPhase::SessionClosed,
        };

        let report = aggregate(&Command::new("test it"), &intent, &strategy, trace);
        assert!(!report.success);
    }
}
