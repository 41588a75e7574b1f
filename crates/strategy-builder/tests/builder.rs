use strategy_builder::{BuilderConfig, SelectorStrategy, StepKind, StrategyBuilder};
use testpilot_core_types::{Intent, IntentSource, Platform, Priority, TestType};

fn intent(platform: Platform, test_type: TestType) -> Intent {
    Intent {
        label: "test_platform".to_string(),
        platform,
        test_type,
        priority: Priority::High,
        confidence: 0.95,
        source: IntentSource::Model,
        target_url: None,
    }
}

#[test]
fn instagram_e2e_covers_login_navigation_and_features() {
    let strategy = StrategyBuilder::default().build(&intent(Platform::Instagram, TestType::E2e));

    assert_eq!(strategy.platform, Platform::Instagram);
    assert_eq!(strategy.priority, Priority::High);
    assert_eq!(strategy.base_url, "https://www.instagram.com");
    assert!(strategy.estimated_secs() > 0);

    let descriptions = strategy.step_descriptions().join("\n").to_lowercase();
    assert!(descriptions.contains("login form"));
    assert!(descriptions.contains("username field"));
    assert!(descriptions.contains("search icon"));
    assert!(descriptions.contains("feed posts"));
    assert!(descriptions.contains("stories container"));

    assert_eq!(strategy.steps[0].kind, StepKind::Navigate);
    let last = strategy.steps.last().unwrap();
    assert_eq!(last.kind, StepKind::CaptureScreenshot);
    assert!(strategy
        .steps
        .iter()
        .any(|s| s.kind == StepKind::Interact && s.depends_on.is_some()));
}

#[test]
fn unknown_platform_gets_generic_strategy() {
    let mut unknown = intent(Platform::Unknown, TestType::Functional);
    let strategy = StrategyBuilder::default().build(&unknown);
    assert_eq!(strategy.steps.len(), 2);
    assert_eq!(strategy.steps[0].kind, StepKind::Navigate);
    assert_eq!(strategy.steps[1].kind, StepKind::CaptureScreenshot);
    assert_eq!(strategy.base_url, "about:blank");

    unknown.target_url = Some("https://example.org".to_string());
    let strategy = StrategyBuilder::default().build(&unknown);
    let target = strategy.steps[0].target.as_ref().unwrap();
    assert_eq!(target.selector.strategy, SelectorStrategy::Url);
    assert_eq!(target.selector.value, "https://example.org");
}

#[test]
fn estimate_is_sum_of_step_weights() {
    let strategy = StrategyBuilder::default().build(&intent(Platform::Unknown, TestType::Ui));
    assert_eq!(strategy.estimated_duration_ms, 3_000 + 800);
    assert_eq!(strategy.estimated_secs(), 4);
}

#[test]
fn fast_mode_is_an_ordered_subset() {
    let full = StrategyBuilder::default().build(&intent(Platform::Instagram, TestType::E2e));
    let fast = StrategyBuilder::new(BuilderConfig::fast())
        .build(&intent(Platform::Instagram, TestType::E2e));

    assert!(fast.fast_mode);
    assert!(fast.steps.len() < full.steps.len());
    assert!(fast.estimated_duration_ms < full.estimated_duration_ms);
    assert!(fast.steps.iter().all(|s| !s.optional && !s.is_screenshot()));

    let full_ids: Vec<_> = full.steps.iter().map(|s| s.id.as_str()).collect();
    let positions: Vec<_> = fast
        .steps
        .iter()
        .map(|s| full_ids.iter().position(|id| *id == s.id).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    for step in &fast.steps {
        if let Some(dep) = &step.depends_on {
            assert!(fast.step(dep).is_some());
        }
    }
}

#[test]
fn build_is_deterministic() {
    let builder = StrategyBuilder::default();
    for platform in Platform::KNOWN {
        for test_type in TestType::ALL {
            let intent = intent(platform, test_type);
            assert_eq!(builder.build(&intent), builder.build(&intent));
        }
    }
}

#[test]
fn security_strategy_checks_https_and_masked_password() {
    let strategy =
        StrategyBuilder::default().build(&intent(Platform::Linkedin, TestType::Security));
    let https = strategy
        .steps
        .iter()
        .find(|s| s.kind == StepKind::Assert)
        .and_then(|s| s.target.as_ref())
        .unwrap();
    assert_eq!(https.selector.strategy, SelectorStrategy::Url);
    assert_eq!(https.selector.value, "https://");

    let masked = strategy
        .steps
        .iter()
        .find(|s| s.description == "Password field is masked")
        .unwrap();
    assert!(masked.depends_on.is_some());
}

#[test]
fn strategy_serializes_with_snake_case_kinds() {
    let strategy = StrategyBuilder::default().build(&intent(Platform::Tiktok, TestType::Ui));
    let json = serde_json::to_value(&strategy).unwrap();
    assert_eq!(json["platform"], "tiktok");
    assert_eq!(json["steps"][0]["kind"], "navigate");
    assert_eq!(json["steps"][0]["id"], "step-01");
}
