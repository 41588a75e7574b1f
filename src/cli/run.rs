use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::commands::CommandArgs;
use super::output::emit_json;
use crate::config::AppConfig;
use crate::pipeline::Pipeline;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub request: CommandArgs,

    /// Also write the report to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Pretty-print the report
    #[arg(long)]
    pub pretty: bool,
}

/// Returns whether the run passed.
pub async fn cmd_run(args: RunArgs, config: &AppConfig) -> Result<bool> {
    let pipeline = Pipeline::new(config).context("building pipeline")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current step before stopping");
            on_interrupt.cancel();
        }
    });

    let result = pipeline
        .run_with_cancellation(args.request.to_command(), &cancel)
        .await;
    watcher.abort();

    let report = result?;
    let wire = report.to_wire();
    emit_json(&wire, args.pretty, args.output.as_deref()).await?;
    Ok(report.success)
}
