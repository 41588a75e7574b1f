use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use super::commands::Commands;
use super::config::cmd_config;
use super::env::CliArgs;
use super::plan::cmd_plan;
use super::run::cmd_run;
use super::runtime::{init_logging, load_config};

/// Exit code when the run completed but did not pass.
const EXIT_RUN_FAILED: u8 = 2;

pub async fn run() -> Result<ExitCode> {
    let cli = CliArgs::parse();

    let loaded = load_config(cli.config.as_deref())?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| loaded.config.logging.level.clone());
    let format = cli.log_format.unwrap_or(loaded.config.logging.format);
    init_logging(&level, cli.debug, format)?;

    info!("Starting TestPilot v{}", env!("CARGO_PKG_VERSION"));
    match &loaded.path {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }

    let result = match cli.command {
        Commands::Run(args) => {
            loaded.config.validate()?;
            cmd_run(args, &loaded.config).await.map(|passed| {
                if passed {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(EXIT_RUN_FAILED)
                }
            })
        }
        Commands::Plan(args) => {
            loaded.config.validate()?;
            cmd_plan(args, &loaded.config).await.map(|()| ExitCode::SUCCESS)
        }
        Commands::Config(args) => cmd_config(args, &loaded).map(|()| ExitCode::SUCCESS),
    };

    if let Err(err) = &result {
        error!("Command failed: {:#}", err);
    }
    result
}
