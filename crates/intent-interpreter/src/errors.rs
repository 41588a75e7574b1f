use thiserror::Error;

/// Failure of a single language-model call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// Network failure, connect error or request timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Endpoint answered 429.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Endpoint answered 5xx.
    #[error("model endpoint returned {status}: {message}")]
    Server { status: u16, message: String },

    /// Endpoint refused the request (4xx other than 429).
    #[error("model endpoint rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No API key configured for the endpoint.
    #[error("missing API credentials for language model")]
    MissingCredentials,

    /// The response carried no content.
    #[error("language model returned an empty response")]
    EmptyResponse,

    /// The response could not be parsed into an intent.
    #[error("malformed model response: {0}")]
    Malformed(String),
}

impl ModelError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Classify an HTTP status returned by the endpoint.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Self::RateLimited(message),
            500..=599 => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }

    /// Whether the retry loop may attempt the call again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ModelError::Transport(_)
                | ModelError::RateLimited(_)
                | ModelError::Server { .. }
                | ModelError::EmptyResponse
                | ModelError::Malformed(_)
        )
    }
}

/// Terminal outcome of the model path. The interpreter never lets this
/// escape `interpret`; it triggers the keyword heuristic instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpretationError {
    #[error("language model failed after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: ModelError },

    #[error("language model failed permanently after {attempts} attempt(s): {source}")]
    Unrecoverable { attempts: u32, source: ModelError },
}

impl InterpretationError {
    pub fn attempts(&self) -> u32 {
        match self {
            InterpretationError::Exhausted { attempts, .. }
            | InterpretationError::Unrecoverable { attempts, .. } => *attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(ModelError::from_status(429, "slow down").is_transient());
        assert!(ModelError::from_status(503, "unavailable").is_transient());
        assert!(!ModelError::from_status(400, "bad model").is_transient());
        assert!(!ModelError::from_status(401, "no key").is_transient());
        assert!(!ModelError::MissingCredentials.is_transient());
        assert!(ModelError::EmptyResponse.is_transient());
    }
}
