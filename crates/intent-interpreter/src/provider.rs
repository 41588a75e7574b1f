use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ModelError;

/// One chat-style completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Abstraction over the external language model so vendors and test
/// doubles plug into the interpreter the same way.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Perform one completion call and return the raw text content.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError>;
}

/// Deterministic model used for tests and offline runs. Responses are
/// served in order; once the queue is drained the fallback repeats.
#[derive(Debug)]
pub struct ScriptedLanguageModel {
    queue: Mutex<VecDeque<Result<String, ModelError>>>,
    fallback: Result<String, ModelError>,
    calls: AtomicU32,
    last_request: Mutex<Option<ChatRequest>>,
}

impl ScriptedLanguageModel {
    pub fn new(responses: Vec<Result<String, ModelError>>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            fallback: Err(ModelError::EmptyResponse),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Answer every call with the same result.
    pub fn always(result: Result<String, ModelError>) -> Self {
        Self {
            fallback: result,
            ..Self::new(Vec::new())
        }
    }

    /// Fail every call with the given error.
    pub fn failing(error: ModelError) -> Self {
        Self::always(Err(error))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());
        let next = self.queue.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
