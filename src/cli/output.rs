use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::fs;
use tracing::info;

/// Print `value` as JSON on stdout and optionally mirror it to `file`.
pub async fn emit_json<T: Serialize>(value: &T, pretty: bool, file: Option<&Path>) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    if let Some(path) = file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path, &rendered)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Report written to {}", path.display());
    }
    println!("{rendered}");
    Ok(())
}
