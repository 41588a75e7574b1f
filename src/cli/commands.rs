use clap::{Args, Subcommand};
use testpilot_core_types::{BrowserKind, Command, ExecutionContext, Platform, Priority, TestType};

use super::config::ConfigArgs;
use super::plan::PlanArgs;
use super::run::RunArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Interpret a request, drive the browser and print the report
    Run(RunArgs),

    /// Interpret a request and print the strategy without a browser
    Plan(PlanArgs),

    /// Inspect TestPilot configuration
    Config(ConfigArgs),
}

/// Request text plus the optional intent and execution overrides.
#[derive(Args, Clone, Debug)]
pub struct CommandArgs {
    /// Natural-language test request, e.g. "test Instagram's login flow"
    pub text: String,

    /// Force the target platform
    #[arg(short = 'p', long)]
    pub platform: Option<Platform>,

    /// Force the test type
    #[arg(short = 't', long)]
    pub test_type: Option<TestType>,

    /// Force the priority
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Drop optional and screenshot steps
    #[arg(long)]
    pub fast: bool,

    /// Browser to drive
    #[arg(short = 'b', long)]
    pub browser: Option<BrowserKind>,

    /// Run the browser headless
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Per-step timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

impl CommandArgs {
    pub fn to_command(&self) -> Command {
        let headless = match (self.headless, self.headed) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        let mut command = Command::new(self.text.clone())
            .with_fast_mode(self.fast)
            .with_context(ExecutionContext {
                browser: self.browser,
                headless,
                timeout_ms: self.timeout_ms,
            });
        if let Some(platform) = self.platform {
            command = command.with_platform(platform);
        }
        if let Some(test_type) = self.test_type {
            command = command.with_test_type(test_type);
        }
        if let Some(priority) = self.priority {
            command = command.with_priority(priority);
        }
        command
    }
}
