pub mod app;
pub mod commands;
pub mod config;
pub mod env;
pub mod output;
pub mod plan;
pub mod run;
pub mod runtime;

pub use app::run;
pub use env::CliArgs;
