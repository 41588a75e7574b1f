use anyhow::Result;
use clap::{Args, Subcommand};

use super::runtime::LoadedConfig;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration with secrets masked
    Show,

    /// Validate the effective configuration
    Validate,
}

pub fn cmd_config(args: ConfigArgs, loaded: &LoadedConfig) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            match &loaded.path {
                Some(path) => println!("# Effective configuration ({})", path.display()),
                None => println!("# Effective configuration (defaults)"),
            }
            println!("{}", serde_yaml::to_string(&loaded.config.redacted())?);
        }
        ConfigAction::Validate => {
            loaded.config.validate()?;
            match &loaded.path {
                Some(path) => println!("Configuration file {} is valid", path.display()),
                None => println!("No configuration file found; defaults are valid"),
            }
        }
    }
    Ok(())
}
