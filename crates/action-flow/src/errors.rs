//! Executor error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a browser driver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The endpoint refused to create a session
    #[error("Session not created: {0}")]
    SessionNotCreated(String),

    /// No element matched the selector
    #[error("No such element: {0}")]
    NoSuchElement(String),

    /// Element reference went stale after a DOM update
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// Driver-side wait or script timeout
    #[error("Driver timeout: {0}")]
    Timeout(String),

    /// Element exists but cannot receive the interaction
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Selector is not valid for the chosen strategy
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// HTTP-level failure talking to the driver endpoint
    #[error("Driver transport error: {0}")]
    Transport(String),

    /// Any other W3C error code
    #[error("WebDriver error '{code}': {message}")]
    Protocol { code: String, message: String },
}

impl DriverError {
    /// Map a W3C WebDriver error code to a typed error.
    pub fn from_w3c(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "session not created" => DriverError::SessionNotCreated(message),
            "no such element" => DriverError::NoSuchElement(message),
            "stale element reference" => DriverError::StaleElement(message),
            "timeout" | "script timeout" => DriverError::Timeout(message),
            "element not interactable" | "element click intercepted" => {
                DriverError::NotInteractable(message)
            }
            "invalid selector" | "invalid argument" => DriverError::InvalidSelector(message),
            other => DriverError::Protocol {
                code: other.to_string(),
                message,
            },
        }
    }

    /// Check if the same action may succeed when attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::StaleElement(_)
                | DriverError::Transport(_)
                | DriverError::NotInteractable(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DriverError::NoSuchElement(_))
    }
}

/// Invocation-level executor failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Browser session could not be opened; no step was attempted
    #[error("session unavailable: {0}")]
    SessionUnavailable(DriverError),

    #[error("failed to write artifact {path}: {message}")]
    Artifact { path: PathBuf, message: String },

    /// A step panicked; the remaining steps were not attempted
    #[error("executor fault: {0}")]
    Fault(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn w3c_codes_map_to_typed_errors() {
        assert!(DriverError::from_w3c("no such element", "x").is_not_found());
        assert!(DriverError::from_w3c("timeout", "x").is_timeout());
        assert!(DriverError::from_w3c("stale element reference", "x").is_retryable());
        assert!(matches!(
            DriverError::from_w3c("unknown command", "x"),
            DriverError::Protocol { .. }
        ));
        assert!(!DriverError::from_w3c("invalid selector", "x").is_retryable());
    }
}
