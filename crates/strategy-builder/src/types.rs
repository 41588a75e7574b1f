//! Step and strategy types shared with the executor.

use serde::{Deserialize, Serialize};
use testpilot_core_types::{Platform, Priority, TestType};

/// How a selector value is interpreted by the browser driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorStrategy {
    Css,
    XPath,
    Id,
    Name,
    TestId,
    AriaLabel,
    LinkText,
    TagName,
    /// Page URL (navigate target, or substring for URL assertions).
    Url,
    /// Page title substring for title assertions.
    Title,
}

impl SelectorStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorStrategy::Css => "css",
            SelectorStrategy::XPath => "xpath",
            SelectorStrategy::Id => "id",
            SelectorStrategy::Name => "name",
            SelectorStrategy::TestId => "data-testid",
            SelectorStrategy::AriaLabel => "aria-label",
            SelectorStrategy::LinkText => "link_text",
            SelectorStrategy::TagName => "tag_name",
            SelectorStrategy::Url => "url",
            SelectorStrategy::Title => "title",
        }
    }

    /// Strategies that address a DOM element rather than page state.
    pub fn is_element(&self) -> bool {
        !matches!(self, SelectorStrategy::Url | SelectorStrategy::Title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub strategy: SelectorStrategy,
    pub value: String,
}

impl Selector {
    pub fn new(strategy: SelectorStrategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(SelectorStrategy::Css, value)
    }

    /// `strategy: value`, as reported in step results.
    pub fn describe(&self) -> String {
        format!("{}: {}", self.strategy.as_str(), self.value)
    }
}

/// What a step acts on: a primary selector and ordered fallbacks tried
/// when the primary does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub selector: Selector,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<Selector>,
}

impl Target {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            fallbacks: Vec::new(),
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::new(Selector::new(SelectorStrategy::Url, url))
    }

    pub fn title(fragment: impl Into<String>) -> Self {
        Self::new(Selector::new(SelectorStrategy::Title, fragment))
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<Selector>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Primary selector first, then fallbacks.
    pub fn candidates(&self) -> impl Iterator<Item = &Selector> {
        std::iter::once(&self.selector).chain(self.fallbacks.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Navigate,
    LocateElement,
    Interact,
    Assert,
    CaptureScreenshot,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Navigate => "navigate",
            StepKind::LocateElement => "locate_element",
            StepKind::Interact => "interact",
            StepKind::Assert => "assert",
            StepKind::CaptureScreenshot => "capture_screenshot",
        }
    }

    /// Static cost in milliseconds used for duration estimates.
    pub fn estimated_ms(&self) -> u64 {
        match self {
            StepKind::Navigate => 3_000,
            StepKind::LocateElement => 1_500,
            StepKind::Interact => 1_000,
            StepKind::Assert => 500,
            StepKind::CaptureScreenshot => 800,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Click,
    /// Type `StepParams::text` into the target.
    Type,
    /// Scroll the page; no target required.
    Scroll,
    /// Press Enter on the target.
    Submit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepParams {
    /// Text to type, or expected text for element assertions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Wait bound override for this step, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Interaction>,
    /// Short name used for screenshot artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One atomic browser-automation action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Stable id (`step-01`, `step-02`, ...).
    pub id: String,
    pub kind: StepKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(default)]
    pub params: StepParams,
    /// Id of a prior step that must succeed for this one to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    /// Optional steps are dropped in fast mode.
    #[serde(default)]
    pub optional: bool,
}

impl Step {
    pub fn is_screenshot(&self) -> bool {
        self.kind == StepKind::CaptureScreenshot
    }

    /// Label for artifacts: explicit label, else the step kind.
    pub fn artifact_label(&self) -> &str {
        self.params.label.as_deref().unwrap_or(self.kind.as_str())
    }
}

/// Ordered step sequence compiled from an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub platform: Platform,
    pub test_type: TestType,
    pub priority: Priority,
    pub base_url: String,
    pub steps: Vec<Step>,
    pub estimated_duration_ms: u64,
    pub fast_mode: bool,
}

impl Strategy {
    pub fn step_descriptions(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.description.clone()).collect()
    }

    /// Estimate in whole seconds, rounded up.
    pub fn estimated_secs(&self) -> u64 {
        self.estimated_duration_ms.div_ceil(1_000)
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Sum of static per-kind weights.
pub fn estimate_duration_ms(steps: &[Step]) -> u64 {
    steps.iter().map(|s| s.kind.estimated_ms()).sum()
}
