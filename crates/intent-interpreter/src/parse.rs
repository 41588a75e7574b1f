//! Parsing the model's structured reply into a typed intent.

use serde::Deserialize;
use testpilot_core_types::{Platform, Priority, TestType, DEFAULT_INTENT_LABEL};

use crate::errors::ModelError;

/// Intent fields as inferred by the model, before overrides apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelIntent {
    pub label: String,
    pub platform: Platform,
    pub test_type: TestType,
    pub priority: Priority,
    /// `None` when the model did not report a confidence.
    pub confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ModelIntentPayload {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    test_type: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Parse raw model content. Empty and malformed content are both
/// reported as errors eligible for retry.
pub fn parse_model_intent(raw: &str) -> Result<ModelIntent, ModelError> {
    if raw.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }

    let json = extract_json_object(raw)
        .ok_or_else(|| ModelError::malformed("response contains no JSON object"))?;
    let payload: ModelIntentPayload = serde_json::from_str(&json)
        .map_err(|err| ModelError::malformed(format!("invalid intent JSON: {err}")))?;

    let platform = payload
        .platform
        .as_deref()
        .map(Platform::from_label)
        .unwrap_or(Platform::Unknown);

    let test_type = match payload.test_type.as_deref() {
        Some(label) => label
            .parse::<TestType>()
            .map_err(|err| ModelError::malformed(err.to_string()))?,
        None => TestType::default(),
    };

    let priority = match payload.priority.as_deref() {
        Some(label) => label
            .parse::<Priority>()
            .map_err(|err| ModelError::malformed(err.to_string()))?,
        None => Priority::default(),
    };

    let confidence = match payload.confidence {
        Some(value) if !value.is_finite() => {
            return Err(ModelError::malformed("confidence is not a finite number"))
        }
        Some(value) => Some(value.clamp(0.0, 1.0)),
        None => None,
    };

    let label = payload
        .intent
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_INTENT_LABEL.to_string());

    Ok(ModelIntent {
        label,
        platform,
        test_type,
        priority,
        confidence,
    })
}

/// Locate a JSON object inside model output that may wrap it in prose or
/// a fenced code block.
pub fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    let rest = raw.split_once('{')?.1;
    let mut depth = 1i32;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let mut candidate = String::from("{");
                    candidate.push_str(&rest[..=idx]);
                    return Some(trim_symmetric(&candidate));
                }
            }
            _ => {}
        }
    }
    None
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_payload() {
        let intent = parse_model_intent(
            r#"{"intent":"test_platform","platform":"instagram","test_type":"e2e","priority":"high","confidence":0.95}"#,
        )
        .unwrap();
        assert_eq!(intent.platform, Platform::Instagram);
        assert_eq!(intent.test_type, TestType::E2e);
        assert_eq!(intent.priority, Priority::High);
        assert_eq!(intent.confidence, Some(0.95));
    }

    #[test]
    fn fills_missing_fields_with_defaults() {
        let intent = parse_model_intent(r#"{"platform":"myspace"}"#).unwrap();
        assert_eq!(intent.platform, Platform::Unknown);
        assert_eq!(intent.test_type, TestType::Functional);
        assert_eq!(intent.priority, Priority::Medium);
        assert_eq!(intent.label, DEFAULT_INTENT_LABEL);
        assert_eq!(intent.confidence, None);
    }

    #[test]
    fn clamps_out_of_range_confidence() {
        let intent = parse_model_intent(r#"{"platform":"tiktok","confidence":1.7}"#).unwrap();
        assert_eq!(intent.confidence, Some(1.0));
    }

    #[test]
    fn empty_and_malformed_are_distinct_errors() {
        assert_eq!(parse_model_intent("   "), Err(ModelError::EmptyResponse));
        assert!(matches!(
            parse_model_intent("I think it is instagram"),
            Err(ModelError::Malformed(_))
        ));
        assert!(matches!(
            parse_model_intent(r#"{"test_type":"smoke"}"#),
            Err(ModelError::Malformed(_))
        ));
    }

    #[test]
    fn extracts_from_fenced_block() {
        let input = "Here you go:\n```json\n{\"platform\":\"youtube\"}\n```";
        let extracted = extract_json_object(input).expect("json");
        assert_eq!(extracted, "{\"platform\":\"youtube\"}");
    }

    #[test]
    fn extracts_from_inline_object() {
        let input = "text { \"platform\": \"facebook\" } more";
        assert_eq!(
            extract_json_object(input).as_deref(),
            Some("{ \"platform\": \"facebook\" }")
        );
        assert!(extract_json_object("no braces").is_none());
    }
}
