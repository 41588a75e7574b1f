//! TestPilot
//!
//! Turns a natural-language testing request into a browser-automation run
//! and a structured report. The stages live in their own crates; this
//! crate wires them together behind configuration and the `testpilot` CLI.

pub mod cli;
pub mod config;
pub mod errors;
pub mod pipeline;

pub use config::AppConfig;
pub use errors::{ConfigError, PipelineError};
pub use pipeline::{Plan, Pipeline};
