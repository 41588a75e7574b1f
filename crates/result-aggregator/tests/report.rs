use std::sync::Arc;
use std::time::Duration;

use action_flow::{
    ArtifactStore, AutomationExecutor, DriverError, ExecutionSettings, MockBrowserDriver,
};
use result_aggregator::aggregate;
use strategy_builder::{BuilderConfig, StrategyBuilder};
use testpilot_core_types::{Command, Intent, IntentSource, Platform, Priority, RunId, TestType};
use tokio_util::sync::CancellationToken;

fn instagram_intent(test_type: TestType) -> Intent {
    Intent {
        label: "test_platform".into(),
        platform: Platform::Instagram,
        test_type,
        priority: Priority::High,
        confidence: 0.95,
        source: IntentSource::Model,
        target_url: None,
    }
}

async fn execute(driver: MockBrowserDriver, artifacts: ArtifactStore, intent: &Intent) -> result_aggregator::Report {
    let command = Command::new("Instagram'ı test et");
    let strategy = StrategyBuilder::new(BuilderConfig::default()).build(intent);
    let settings = ExecutionSettings {
        retry_backoff: Duration::ZERO,
        ..ExecutionSettings::default()
    };
    let executor = AutomationExecutor::new(Arc::new(driver), artifacts);
    let trace = executor
        .execute(&RunId::new(), &strategy, &settings, &CancellationToken::new())
        .await;
    aggregate(&command, intent, &strategy, trace)
}

#[tokio::test]
async fn successful_run_renders_wire_document() {
    let dir = tempfile::tempdir().unwrap();
    let intent = instagram_intent(TestType::E2e);
    let report = execute(
        MockBrowserDriver::new().with_title("Instagram"),
        ArtifactStore::new(dir.path()),
        &intent,
    )
    .await;

    assert!(report.success);
    assert_eq!(report.step_results.len(), report.strategy.steps.len());
    assert!(report.screenshots.len() <= report.strategy.steps.len());
    assert_eq!(
        report.total_duration_ms,
        report.step_results.iter().map(|r| r.duration_ms).sum::<u64>()
    );

    let json = report.to_json().unwrap();
    assert_eq!(json["command"], "Instagram'ı test et");
    assert_eq!(json["ai_analysis"]["parsed_intent"], "test_platform");
    assert_eq!(json["ai_analysis"]["platform"], "instagram");
    assert_eq!(json["ai_analysis"]["test_type"], "e2e");
    assert_eq!(json["test_strategy"]["priority"], "high");
    assert!(json["test_strategy"]["estimated_time"].as_u64().unwrap() > 0);
    assert_eq!(
        json["test_strategy"]["steps"].as_array().unwrap().len(),
        report.strategy.steps.len()
    );
    assert_eq!(json["automation_results"]["success"], true);
    assert_eq!(
        json["automation_results"]["screenshots"].as_array().unwrap().len(),
        2
    );
    assert_eq!(
        json["automation_results"]["elements_found"].as_u64().unwrap() as usize,
        report.elements_found
    );
}

#[tokio::test]
async fn session_failure_reports_every_step_skipped() {
    let intent = instagram_intent(TestType::Functional);
    let report = execute(
        MockBrowserDriver::new().with_open_failure(DriverError::SessionNotCreated("no driver".into())),
        ArtifactStore::new("unused"),
        &intent,
    )
    .await;

    assert!(!report.success);
    assert_eq!(report.summary.skipped_steps, report.strategy.steps.len());
    assert!(report.screenshots.is_empty());
    assert_eq!(report.total_duration_ms, 0);
    assert!(report.session_error.is_some());
    assert_eq!(report.to_json().unwrap()["automation_results"]["success"], false);
}

#[tokio::test]
async fn missing_logo_fails_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let intent = instagram_intent(TestType::Ui);
    let driver = MockBrowserDriver::new().with_title("Instagram");
    let logo = intent_logo_selectors();
    let driver = logo.into_iter().fold(driver, |d, s| d.with_missing(s));
    let report = execute(driver, ArtifactStore::new(dir.path()), &intent).await;

    assert!(!report.success);
    assert!(report.summary.failed_steps >= 1);
    assert!(report.summary.success_rate < 1.0);
    assert!(!report.screenshots.is_empty());
}

fn intent_logo_selectors() -> Vec<String> {
    let profile = strategy_builder::profile(Platform::Instagram).unwrap();
    let target = profile.logo.target().unwrap();
    target.candidates().map(|s| s.value.clone()).collect()
}
