//! Shared primitives for the TestPilot pipeline.
//!
//! Every stage (interpreter, strategy builder, executor, aggregator) speaks
//! in these types. They are plain data: owned by a single pipeline
//! invocation and never mutated once handed to the next stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Raised when a textual label does not name a known variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseLabelError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Target platform under test.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    Twitter,
    Linkedin,
    Youtube,
    Tiktok,
    Unknown,
}

impl Platform {
    /// Recognised platforms, in keyword-matching priority order.
    pub const KNOWN: [Platform; 6] = [
        Platform::Instagram,
        Platform::Facebook,
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Youtube,
        Platform::Tiktok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Unknown => "unknown",
        }
    }

    /// Lenient conversion used for model output: anything unrecognised
    /// becomes [`Platform::Unknown`] instead of an error.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Platform::Unknown)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Platform::Unknown)
    }
}

impl FromStr for Platform {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "twitter" | "x" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::Linkedin),
            "youtube" => Ok(Platform::Youtube),
            "tiktok" => Ok(Platform::Tiktok),
            "unknown" | "web" => Ok(Platform::Unknown),
            other => Err(ParseLabelError::new("platform", other)),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of test requested for the platform.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Ui,
    Functional,
    Performance,
    Security,
    Accessibility,
    E2e,
}

impl TestType {
    pub const ALL: [TestType; 6] = [
        TestType::Ui,
        TestType::Functional,
        TestType::Performance,
        TestType::Security,
        TestType::Accessibility,
        TestType::E2e,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Ui => "ui",
            TestType::Functional => "functional",
            TestType::Performance => "performance",
            TestType::Security => "security",
            TestType::Accessibility => "accessibility",
            TestType::E2e => "e2e",
        }
    }
}

impl Default for TestType {
    fn default() -> Self {
        TestType::Functional
    }
}

impl FromStr for TestType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ui" => Ok(TestType::Ui),
            "functional" => Ok(TestType::Functional),
            "performance" => Ok(TestType::Performance),
            "security" => Ok(TestType::Security),
            "accessibility" | "a11y" => Ok(TestType::Accessibility),
            "e2e" | "end-to-end" => Ok(TestType::E2e),
            other => Err(ParseLabelError::new("test type", other)),
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl FromStr for Priority {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ParseLabelError::new("priority", other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser engine requested for a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Edge,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "edge",
        }
    }

    /// W3C `browserName` capability value.
    pub fn capability_name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "MicrosoftEdge",
        }
    }
}

impl Default for BrowserKind {
    fn default() -> Self {
        BrowserKind::Chrome
    }
}

impl FromStr for BrowserKind {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" => Ok(BrowserKind::Firefox),
            "edge" | "msedge" => Ok(BrowserKind::Edge),
            other => Err(ParseLabelError::new("browser", other)),
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-command execution settings. Missing values fall back to the
/// pipeline configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default)]
    pub browser: Option<BrowserKind>,
    #[serde(default)]
    pub headless: Option<bool>,
    /// Per-step wait bound in milliseconds.
    #[serde(default, rename = "timeout")]
    pub timeout_ms: Option<u64>,
}

/// Caller supplied values that take precedence over inferred ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntentOverrides {
    pub platform: Option<Platform>,
    pub test_type: Option<TestType>,
    pub priority: Option<Priority>,
}

impl IntentOverrides {
    /// True when every intent field is supplied by the caller.
    pub fn is_complete(&self) -> bool {
        self.platform.is_some() && self.test_type.is_some() && self.priority.is_some()
    }
}

/// A validated testing request as received from the routing layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub text: String,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub test_type: Option<TestType>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub fast_mode: bool,
    #[serde(default)]
    pub context: ExecutionContext,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            platform: None,
            test_type: None,
            priority: None,
            fast_mode: false,
            context: ExecutionContext::default(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_test_type(mut self, test_type: TestType) -> Self {
        self.test_type = Some(test_type);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_fast_mode(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    pub fn overrides(&self) -> IntentOverrides {
        IntentOverrides {
            platform: self.platform,
            test_type: self.test_type,
            priority: self.priority,
        }
    }
}

/// Where the values of an [`Intent`] came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    /// Structured language-model response.
    Model,
    /// Keyword heuristic after the model path was exhausted.
    Heuristic,
    /// Every field was supplied by the caller; nothing was inferred.
    Overrides,
}

/// Structured interpretation of a [`Command`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Model's intent label (`parsed_intent` on the wire).
    pub label: String,
    pub platform: Platform,
    pub test_type: TestType,
    pub priority: Priority,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub source: IntentSource,
    /// Explicit URL mentioned in the command text, if any.
    #[serde(default)]
    pub target_url: Option<String>,
}

pub const DEFAULT_INTENT_LABEL: &str = "test_platform";

/// Identifier of one pipeline invocation.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
