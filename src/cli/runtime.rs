use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, LogFormat};

const LOCAL_CONFIG: &str = "config/testpilot.yaml";

/// `RUST_LOG` wins over `level`; `debug` forces DEBUG. Logs go to stderr.
pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: AppConfig,
    /// File the configuration came from; `None` when running on defaults.
    pub path: Option<PathBuf>,
}

/// Resolve the config file, parse it and apply environment overrides.
///
/// Lookup order: explicit path, `./config/testpilot.yaml`, then
/// `<config dir>/testpilot/config.yaml`. An explicit path must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };

    let mut config = match &path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => AppConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;

    Ok(LoadedConfig { config, path })
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("testpilot").join("config.yaml"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn explicit_file_and_env_are_combined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testpilot.yaml");
        std::fs::write(&path, "llm:\n  max_retries: 7\npipeline:\n  max_concurrent_runs: 3\n").unwrap();

        std::env::set_var("OPENAI_MODEL", "gpt-4o");
        let loaded = load_config(Some(&path));
        std::env::remove_var("OPENAI_MODEL");

        let loaded = loaded.unwrap();
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.llm.max_retries, 7);
        assert_eq!(loaded.config.llm.model, "gpt-4o");
        assert_eq!(loaded.config.pipeline.max_concurrent_runs, 3);
    }

    #[test]
    #[serial]
    fn missing_explicit_file_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/testpilot.yaml"))).is_err());
    }

    #[test]
    #[serial]
    fn bad_env_override_is_reported() {
        std::env::set_var("TESTPILOT_MAX_CONCURRENT_RUNS", "lots");
        let result = load_config(None);
        std::env::remove_var("TESTPILOT_MAX_CONCURRENT_RUNS");
        assert!(result.is_err());
    }
}
