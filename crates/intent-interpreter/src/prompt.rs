//! Prompt construction for intent analysis.

use crate::provider::ChatRequest;

/// Longest command text embedded in a prompt, in characters.
pub const MAX_COMMAND_CHARS: usize = 1000;

const SYSTEM_PROMPT: &str = r#"You are a QA test analyst. Classify the user's testing request.

Supported platforms: instagram, facebook, twitter, linkedin, youtube, tiktok
Test types: ui, functional, performance, security, accessibility, e2e
Priorities: low, medium, high

Reply with a single JSON object and nothing else:
{
  "intent": "test_platform",
  "platform": "instagram",
  "test_type": "functional",
  "priority": "medium",
  "confidence": 0.8
}

Use "unknown" as platform when the request names none of the supported platforms.
confidence is a number between 0 and 1."#;

/// Builds the fixed-shape prompt for one command.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_command_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            max_command_chars: MAX_COMMAND_CHARS,
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_command_chars(mut self, max: usize) -> Self {
        self.max_command_chars = max;
        self
    }

    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    pub fn user_prompt(&self, command_text: &str) -> String {
        format!(
            "Command: {}",
            truncate_chars(command_text.trim(), self.max_command_chars)
        )
    }

    pub fn build(&self, command_text: &str, max_tokens: u32, temperature: f32) -> ChatRequest {
        ChatRequest {
            system: self.system_prompt().to_string(),
            user: self.user_prompt(command_text),
            max_tokens,
            temperature,
        }
    }
}

/// Cut `text` to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_is_bounded() {
        let long = "ş".repeat(MAX_COMMAND_CHARS + 50);
        let prompt = PromptBuilder::new().user_prompt(&long);
        assert_eq!(
            prompt.chars().count(),
            "Command: ".chars().count() + MAX_COMMAND_CHARS
        );
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_chars("Instagram'ı test et", 100), "Instagram'ı test et");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn request_embeds_schema_instruction() {
        let request = PromptBuilder::new().build("test facebook", 200, 0.3);
        assert!(request.system.contains("\"test_type\""));
        assert_eq!(request.user, "Command: test facebook");
        assert_eq!(request.max_tokens, 200);
    }
}
