use anyhow::{Context, Result};
use clap::Args;

use super::commands::CommandArgs;
use super::output::emit_json;
use crate::config::AppConfig;
use crate::pipeline::Pipeline;

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub request: CommandArgs,

    /// Skip the language model and use the keyword heuristic
    #[arg(long)]
    pub offline: bool,

    /// Pretty-print the plan
    #[arg(long)]
    pub pretty: bool,
}

pub async fn cmd_plan(args: PlanArgs, config: &AppConfig) -> Result<()> {
    let pipeline = Pipeline::new(config).context("building pipeline")?;
    let plan = pipeline
        .plan(&args.request.to_command(), args.offline)
        .await?;
    emit_json(&plan, args.pretty, None).await
}
