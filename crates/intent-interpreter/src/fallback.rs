//! Ordered provider chain.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::errors::ModelError;
use crate::provider::{ChatRequest, LanguageModel};

/// Tries each provider in order and returns the first successful
/// completion. Every call starts again from the first provider.
pub struct FallbackLanguageModel {
    providers: Vec<Arc<dyn LanguageModel>>,
    name: String,
}

impl FallbackLanguageModel {
    pub fn new(providers: Vec<Arc<dyn LanguageModel>>) -> Self {
        let name = providers
            .iter()
            .map(|provider| provider.name())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self { providers, name }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }
}

#[async_trait]
impl LanguageModel for FallbackLanguageModel {
    fn name(&self) -> &str {
        &self.name
    }

    /// When every provider fails, the last transient error is returned so
    /// the caller's retry loop still applies; otherwise the last error.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let mut last_error = None;
        let mut last_transient = None;

        for provider in &self.providers {
            debug!(provider = provider.name(), "trying language model");
            match provider.complete(request).await {
                Ok(content) => {
                    info!(provider = provider.name(), "language model answered");
                    return Ok(content);
                }
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "language model failed");
                    if err.is_transient() {
                        last_transient = Some(err.clone());
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_transient
            .or(last_error)
            .unwrap_or(ModelError::MissingCredentials))
    }
}
