use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ModelError;
use crate::openai::error_message;
use crate::provider::{ChatRequest, LanguageModel};

pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Messages API client.
pub struct AnthropicLanguageModel {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicLanguageModel {
    pub fn new(config: AnthropicConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ModelError::transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.config.api_base.trim_end_matches('/'))
    }

    fn body(&self, request: &ChatRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.user.clone(),
            }],
        }
    }
}

#[async_trait]
impl LanguageModel for AnthropicLanguageModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ModelError::MissingCredentials)?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|err| ModelError::transport(format!("anthropic request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            let message = error_message(&text);
            warn!(target: "anthropic", status = status.as_u16(), %message, "messages request failed");
            return Err(ModelError::from_status(status.as_u16(), message));
        }

        let response: MessagesResponse = response
            .json()
            .await
            .map_err(|err| ModelError::malformed(format!("anthropic response invalid: {err}")))?;

        if let Some(usage) = &response.usage {
            debug!(
                target: "anthropic",
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "messages usage"
            );
        }

        first_text(response)
    }
}

fn first_text(response: MessagesResponse) -> Result<String, ModelError> {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .find_map(|block| block.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ModelError::EmptyResponse)
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            system: "sys".into(),
            user: "Command: test instagram".into(),
            max_tokens: 500,
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let model = AnthropicLanguageModel::new(AnthropicConfig::default()).unwrap();
        let err = model.complete(&request()).await.unwrap_err();
        assert_eq!(err, ModelError::MissingCredentials);
    }

    #[test]
    fn system_prompt_is_a_top_level_field() {
        let model = AnthropicLanguageModel::new(AnthropicConfig::default()).unwrap();
        assert_eq!(model.endpoint(), "https://api.anthropic.com/v1/messages");

        let body = serde_json::to_value(model.body(&request())).unwrap();
        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn first_text_block_is_returned() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"tool_use","id":"x"},{"type":"text","text":"{\"platform\":\"instagram\"}"}]}"#,
        )
        .unwrap();
        assert_eq!(first_text(response).unwrap(), r#"{"platform":"instagram"}"#);

        let empty: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(first_text(empty).unwrap_err(), ModelError::EmptyResponse);
    }
}
