//! Deterministic keyword classifier used when the model path is exhausted,
//! and for offline planning.

use once_cell::sync::Lazy;
use regex::Regex;
use testpilot_core_types::{
    Intent, IntentOverrides, IntentSource, Platform, Priority, TestType, DEFAULT_INTENT_LABEL,
};

/// Upper bound on any heuristic confidence.
pub const HEURISTIC_CONFIDENCE_CAP: f64 = 0.5;

const EXACT_PLATFORM_SCORE: f64 = 0.5;
const ALIAS_PLATFORM_SCORE: f64 = 0.4;
const KEYWORD_SCORE: f64 = 0.45;
const DEFAULT_TEST_TYPE_SCORE: f64 = 0.2;
const DEFAULT_PRIORITY_SCORE: f64 = 0.25;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).expect("valid url pattern"));

fn platform_aliases(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Instagram => &["ig", "insta", "gram", "story", "reel", "post"],
        Platform::Facebook => &["fb", "meta", "wall", "timeline"],
        Platform::Twitter => &["x", "tweet", "thread"],
        Platform::Linkedin => &["professional", "network"],
        Platform::Youtube => &["yt", "video", "channel"],
        Platform::Tiktok => &["tt", "short"],
        Platform::Unknown => &[],
    }
}

fn test_type_keywords(test_type: TestType) -> &'static [&'static str] {
    match test_type {
        TestType::Ui => &["ui", "görsel", "visual"],
        TestType::Performance => &["performans", "performance", "hız", "speed", "load"],
        TestType::Security => &["güvenlik", "security"],
        TestType::Accessibility => &["erişilebilirlik", "accessibility", "a11y"],
        TestType::E2e => &["e2e", "end-to-end", "uçtan uca"],
        TestType::Functional => &["functional", "fonksiyonel"],
    }
}

const HIGH_PRIORITY_KEYWORDS: &[&str] = &["acil", "kritik", "urgent", "critical", "high"];
const LOW_PRIORITY_KEYWORDS: &[&str] = &["düşük", "low", "minor"];
const TEST_VERBS: &[&str] = &["test", "kontrol et", "doğrula", "verify", "check"];

/// Lowercased command text plus its word tokens.
struct Normalized {
    lower: String,
    words: Vec<String>,
}

impl Normalized {
    fn new(text: &str) -> Self {
        let lower = text.to_lowercase();
        let words = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self { lower, words }
    }

    /// Short keywords only match whole words so "x" or "ui" do not hit
    /// arbitrary text.
    fn contains(&self, keyword: &str) -> bool {
        if keyword.chars().count() <= 3 {
            self.words.iter().any(|w| w == keyword)
        } else {
            self.lower.contains(keyword)
        }
    }

    fn contains_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.contains(k))
    }
}

/// Platform inferred from keywords with its field confidence.
pub fn infer_platform(text: &str) -> (Platform, f64) {
    let norm = Normalized::new(text);
    if let Some(platform) = Platform::KNOWN
        .iter()
        .find(|p| norm.contains(p.as_str()))
    {
        return (*platform, EXACT_PLATFORM_SCORE);
    }
    Platform::KNOWN
        .iter()
        .find(|p| norm.contains_any(platform_aliases(**p)))
        .map(|p| (*p, ALIAS_PLATFORM_SCORE))
        .unwrap_or((Platform::Unknown, 0.0))
}

pub fn infer_test_type(text: &str) -> (TestType, f64) {
    let norm = Normalized::new(text);
    TestType::ALL
        .iter()
        .find(|t| norm.contains_any(test_type_keywords(**t)))
        .map(|t| (*t, KEYWORD_SCORE))
        .unwrap_or((TestType::default(), DEFAULT_TEST_TYPE_SCORE))
}

pub fn infer_priority(text: &str) -> (Priority, f64) {
    let norm = Normalized::new(text);
    if norm.contains_any(HIGH_PRIORITY_KEYWORDS) {
        (Priority::High, KEYWORD_SCORE)
    } else if norm.contains_any(LOW_PRIORITY_KEYWORDS) {
        (Priority::Low, KEYWORD_SCORE)
    } else {
        (Priority::default(), DEFAULT_PRIORITY_SCORE)
    }
}

/// First http(s) URL in the text, without trailing punctuation.
pub fn extract_target_url(text: &str) -> Option<String> {
    URL_RE.find(text).map(|m| {
        m.as_str()
            .trim_end_matches(['.', ',', ';', ':', ')', '!', '?'])
            .to_string()
    })
}

/// Confidence for a model answer that omitted one: rewards commands that
/// mention the platform and read like a test request.
pub fn keyword_confidence(text: &str, platform: Platform) -> f64 {
    let norm = Normalized::new(text);
    let mut confidence = 0.0;
    if platform.is_known() {
        if norm.contains(platform.as_str()) || norm.contains_any(platform_aliases(platform)) {
            confidence += 0.3;
        }
        if norm.lower.contains(platform.as_str()) {
            confidence += 0.1;
        }
    }
    if TEST_VERBS.iter().any(|k| norm.lower.contains(k)) {
        confidence += 0.4;
    }
    if text.split_whitespace().count() >= 2 {
        confidence += 0.2;
    }
    f64::min(confidence, 1.0)
}

/// Classify `text` without a model. Only the fields not covered by
/// `overrides` contribute to the confidence, which never exceeds
/// [`HEURISTIC_CONFIDENCE_CAP`].
pub fn heuristic_intent(text: &str, overrides: &IntentOverrides) -> Intent {
    let mut scores = Vec::with_capacity(3);

    let platform = match overrides.platform {
        Some(platform) => platform,
        None => {
            let (platform, score) = infer_platform(text);
            scores.push(score);
            platform
        }
    };
    let test_type = match overrides.test_type {
        Some(test_type) => test_type,
        None => {
            let (test_type, score) = infer_test_type(text);
            scores.push(score);
            test_type
        }
    };
    let priority = match overrides.priority {
        Some(priority) => priority,
        None => {
            let (priority, score) = infer_priority(text);
            scores.push(score);
            priority
        }
    };

    let confidence = if scores.is_empty() {
        HEURISTIC_CONFIDENCE_CAP
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    Intent {
        label: DEFAULT_INTENT_LABEL.to_string(),
        platform,
        test_type,
        priority,
        confidence: confidence.clamp(0.0, HEURISTIC_CONFIDENCE_CAP),
        source: IntentSource::Heuristic,
        target_url: extract_target_url(text),
    }
}
