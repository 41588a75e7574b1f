use std::sync::Arc;
use std::time::Duration;

use action_flow::{
    ArtifactStore, AutomationExecutor, DriverError, ExecutionSettings, ExecutionTrace,
    MockBrowserDriver, SessionPhase, StepError, StepOutcome,
};
use strategy_builder::{
    BuilderConfig, Interaction, Selector, Step, StepKind, StepParams, Strategy, StrategyBuilder,
    Target,
};
use testpilot_core_types::{Intent, IntentSource, Platform, Priority, RunId, TestType};
use tokio_util::sync::CancellationToken;

fn step(id: &str, kind: StepKind, target: Option<Target>) -> Step {
    Step {
        id: id.into(),
        kind,
        description: format!("{} {}", kind.as_str(), id),
        target,
        params: StepParams::default(),
        depends_on: None,
        optional: false,
    }
}

fn navigate(id: &str) -> Step {
    step(id, StepKind::Navigate, Some(Target::url("https://example.org")))
}

fn locate(id: &str, css: &str) -> Step {
    step(id, StepKind::LocateElement, Some(Target::new(Selector::css(css))))
}

fn click(id: &str, css: &str, depends_on: &str) -> Step {
    let mut step = step(id, StepKind::Interact, Some(Target::new(Selector::css(css))));
    step.params.interaction = Some(Interaction::Click);
    step.depends_on = Some(depends_on.into());
    step
}

fn screenshot(id: &str, label: &str) -> Step {
    let mut step = step(id, StepKind::CaptureScreenshot, None);
    step.params.label = Some(label.into());
    step
}

fn strategy(steps: Vec<Step>) -> Strategy {
    Strategy {
        platform: Platform::Unknown,
        test_type: TestType::Functional,
        priority: Priority::Medium,
        base_url: "https://example.org".into(),
        estimated_duration_ms: strategy_builder::estimate_duration_ms(&steps),
        steps,
        fast_mode: false,
    }
}

fn quick_settings() -> ExecutionSettings {
    ExecutionSettings {
        retry_backoff: Duration::ZERO,
        ..ExecutionSettings::default()
    }
}

async fn run(
    driver: &MockBrowserDriver,
    artifacts: ArtifactStore,
    strategy: &Strategy,
    settings: &ExecutionSettings,
    cancel: &CancellationToken,
) -> ExecutionTrace {
    let executor = AutomationExecutor::new(Arc::new(driver.clone()), artifacts);
    executor
        .execute(&RunId::new(), strategy, settings, cancel)
        .await
}

#[tokio::test]
async fn failed_locate_skips_dependent_step_but_not_later_ones() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockBrowserDriver::new().with_missing("#missing");
    let strategy = strategy(vec![
        navigate("step-01"),
        locate("step-02", "#missing"),
        click("step-03", "#missing", "step-02"),
        screenshot("step-04", "final"),
    ]);

    let trace = run(
        &driver,
        ArtifactStore::new(dir.path()),
        &strategy,
        &quick_settings(),
        &CancellationToken::new(),
    )
    .await;

    let outcomes: Vec<_> = trace.step_results.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            StepOutcome::Success,
            StepOutcome::Failure,
            StepOutcome::Skipped,
            StepOutcome::Success
        ]
    );
    assert_eq!(trace.step_results[1].attempts, 2);
    assert_eq!(
        trace.step_results[2].error,
        Some(StepError::SkippedDependency("step-02".into()))
    );
    assert!(!driver.actions().iter().any(|a| a.starts_with("click:")));

    let artifact = trace.step_results[3].artifact.clone().unwrap();
    assert!(artifact.exists());
    assert_eq!(trace.artifacts().count(), 1);
    assert_eq!(driver.sessions_closed(), 1);
    assert_eq!(trace.final_phase, SessionPhase::SessionClosed);
}

#[tokio::test]
async fn session_open_failure_skips_every_step() {
    let driver = MockBrowserDriver::new()
        .with_open_failure(DriverError::SessionNotCreated("chromedriver not running".into()));
    let strategy = strategy(vec![navigate("step-01"), screenshot("step-02", "home")]);

    let trace = run(
        &driver,
        ArtifactStore::new("unused"),
        &strategy,
        &quick_settings(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(trace.step_results.len(), strategy.steps.len());
    assert!(trace.step_results.iter().all(|r| matches!(
        r.error,
        Some(StepError::SessionUnavailable(_))
    )));
    assert!(trace.session_error.is_some());
    assert_eq!(trace.artifacts().count(), 0);
    assert_eq!(driver.sessions_closed(), 0);
    assert!(driver.actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_step_times_out_and_run_continues() {
    let driver = MockBrowserDriver::new().with_delay("#slow", Duration::from_secs(30));
    let strategy = strategy(vec![
        locate("step-01", "#slow"),
        navigate("step-02"),
    ]);
    let settings = ExecutionSettings {
        step_timeout: Duration::from_secs(1),
        ..quick_settings()
    };

    let trace = run(
        &driver,
        ArtifactStore::new("unused"),
        &strategy,
        &settings,
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        trace.step_results[0].error,
        Some(StepError::Timeout { after_ms: 1_000, .. })
    ));
    assert!(trace.step_results[1].succeeded());
    assert_eq!(driver.sessions_closed(), 1);
}

#[tokio::test]
async fn transient_lookup_error_is_retried() {
    let driver = MockBrowserDriver::new()
        .with_transient_error("#logo", DriverError::StaleElement("re-rendered".into()));
    let strategy = strategy(vec![locate("step-01", "#logo")]);

    let trace = run(
        &driver,
        ArtifactStore::new("unused"),
        &strategy,
        &quick_settings(),
        &CancellationToken::new(),
    )
    .await;

    let result = &trace.step_results[0];
    assert!(result.succeeded());
    assert_eq!(result.attempts, 2);
    assert_eq!(result.selector_used.as_deref(), Some("css: #logo"));
}

#[tokio::test]
async fn screenshot_failure_keeps_step_successful() {
    let driver = MockBrowserDriver::new().with_screenshot_failure();
    let strategy = strategy(vec![navigate("step-01"), screenshot("step-02", "home")]);

    let trace = run(
        &driver,
        ArtifactStore::new("unused"),
        &strategy,
        &quick_settings(),
        &CancellationToken::new(),
    )
    .await;

    let shot = &trace.step_results[1];
    assert!(shot.succeeded());
    assert!(shot.artifact.is_none());
    assert!(!shot.notes.is_empty());
}

#[tokio::test]
async fn typing_without_text_fails() {
    let driver = MockBrowserDriver::new();
    let mut type_step = step(
        "step-02",
        StepKind::Interact,
        Some(Target::new(Selector::css("#field"))),
    );
    type_step.params.interaction = Some(Interaction::Type);
    type_step.depends_on = Some("step-01".into());
    let strategy = strategy(vec![locate("step-01", "#field"), type_step]);

    let trace = run(
        &driver,
        ArtifactStore::new("unused"),
        &strategy,
        &quick_settings(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(trace.step_results[1].outcome, StepOutcome::Failure);
    assert!(!driver.actions().iter().any(|a| a.starts_with("type:")));
}

#[tokio::test]
async fn screenshot_each_step_attaches_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockBrowserDriver::new();
    let strategy = strategy(vec![navigate("step-01"), locate("step-02", "#logo")]);
    let settings = ExecutionSettings {
        screenshot_each_step: true,
        ..quick_settings()
    };

    let trace = run(
        &driver,
        ArtifactStore::new(dir.path()),
        &strategy,
        &settings,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(trace.artifacts().count(), 2);
    assert!(trace.step_results.iter().all(|r| r.succeeded()));
}

#[tokio::test]
async fn cancelled_before_start_opens_no_session() {
    let driver = MockBrowserDriver::new();
    let strategy = strategy(vec![navigate("step-01"), screenshot("step-02", "home")]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let trace = run(
        &driver,
        ArtifactStore::new("unused"),
        &strategy,
        &quick_settings(),
        &cancel,
    )
    .await;

    assert!(trace.cancelled);
    assert_eq!(driver.sessions_opened(), 0);
    assert!(trace
        .step_results
        .iter()
        .all(|r| r.error == Some(StepError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_run_skips_remaining_steps() {
    let driver = MockBrowserDriver::new().with_delay("https://example.org", Duration::from_millis(500));
    let strategy = strategy(vec![
        navigate("step-01"),
        locate("step-02", "#logo"),
        screenshot("step-03", "final"),
    ]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let trace = run(
        &driver,
        ArtifactStore::new("unused"),
        &strategy,
        &quick_settings(),
        &cancel,
    )
    .await;

    assert!(trace.cancelled);
    assert_eq!(trace.step_results.len(), 3);
    assert!(trace.step_results.iter().all(|r| r.is_skipped()));
    assert!(!driver.actions().iter().any(|a| a == "screenshot"));
    assert_eq!(driver.sessions_closed(), 1);
}

#[tokio::test]
async fn panicking_driver_still_closes_session() {
    let driver = MockBrowserDriver::new().with_panic_on("#boom");
    let strategy = strategy(vec![
        navigate("step-01"),
        locate("step-02", "#boom"),
        screenshot("step-03", "final"),
    ]);

    let trace = run(
        &driver,
        ArtifactStore::new("unused"),
        &strategy,
        &quick_settings(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(trace.step_results.len(), 3);
    assert!(trace.step_results[0].succeeded());
    assert_eq!(trace.step_results[1].outcome, StepOutcome::Failure);
    assert_eq!(trace.step_results[1].attempts, 1);
    assert!(matches!(
        &trace.step_results[1].error,
        Some(StepError::Failed(message)) if message.contains("#boom")
    ));
    assert!(trace.step_results[2].is_skipped());
    assert!(trace.session_error.is_some());
    assert_eq!(driver.sessions_closed(), 1);
    assert_eq!(trace.final_phase, SessionPhase::SessionClosed);
}

#[tokio::test(start_paused = true)]
async fn dropped_execution_still_closes_session() {
    let driver = MockBrowserDriver::new().with_delay("#logo", Duration::from_millis(800));
    let executor = AutomationExecutor::new(Arc::new(driver.clone()), ArtifactStore::new("unused"));
    let strategy = strategy(vec![navigate("step-01"), locate("step-02", "#logo")]);
    let run_id = RunId::new();
    let settings = quick_settings();
    let cancel = CancellationToken::new();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        executor.execute(&run_id, &strategy, &settings, &cancel),
    )
    .await;
    assert!(abandoned.is_err());

    // Let the background close task run.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(driver.sessions_opened(), 1);
    assert_eq!(driver.sessions_closed(), 1);
}

#[tokio::test]
async fn instagram_e2e_strategy_runs_against_mock() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockBrowserDriver::new().with_title("Instagram");
    let intent = Intent {
        label: "test_platform".into(),
        platform: Platform::Instagram,
        test_type: TestType::E2e,
        priority: Priority::High,
        confidence: 0.9,
        source: IntentSource::Model,
        target_url: None,
    };
    let strategy = StrategyBuilder::new(BuilderConfig::default()).build(&intent);

    let trace = run(
        &driver,
        ArtifactStore::new(dir.path()),
        &strategy,
        &quick_settings(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(trace.step_results.len(), strategy.steps.len());
    assert!(trace.step_results.iter().all(|r| r.succeeded()));
    assert_eq!(trace.artifacts().count(), 2);
    let actions = driver.actions();
    assert_eq!(actions[0], "navigate:https://www.instagram.com");
    assert!(actions.iter().any(|a| a.starts_with("type:")));
    assert!(!actions.iter().any(|a| a.starts_with("submit:")));
}
