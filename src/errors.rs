//! Error types for the pipeline boundary and configuration loading

use std::path::PathBuf;

use thiserror::Error;

/// The only failures `Pipeline::run` reports; everything below the
/// session level is recorded in the report instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("command text is empty")]
    EmptyCommand,

    #[error("failed to set up pipeline: {0}")]
    Setup(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }
}
