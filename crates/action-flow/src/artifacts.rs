use std::path::{Path, PathBuf};

use testpilot_core_types::RunId;
use tracing::debug;

use crate::errors::ExecutionError;

pub const DEFAULT_ARTIFACT_DIR: &str = "test_results/screenshots";

/// Writes screenshot artifacts under `<root>/<run_id>/<step_id>-<label>.png`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACT_DIR)
    }
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, run_id: &RunId, step_id: &str, label: &str) -> PathBuf {
        self.root
            .join(&run_id.0)
            .join(format!("{}-{}.png", sanitize(step_id), sanitize(label)))
    }

    pub async fn save_screenshot(
        &self,
        run_id: &RunId,
        step_id: &str,
        label: &str,
        png: &[u8],
    ) -> Result<PathBuf, ExecutionError> {
        let path = self.path_for(run_id, step_id, label);
        let to_error = |err: std::io::Error| ExecutionError::Artifact {
            path: path.clone(),
            message: err.to_string(),
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(to_error)?;
        }
        tokio::fs::write(&path, png).await.map_err(to_error)?;
        debug!(path = %path.display(), bytes = png.len(), "screenshot saved");
        Ok(path)
    }
}

fn sanitize(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_follows_run_and_step_layout() {
        let store = ArtifactStore::new("/tmp/shots");
        let run = RunId("run-1".into());
        assert_eq!(
            store.path_for(&run, "step-03", "Login Form"),
            PathBuf::from("/tmp/shots/run-1/step-03-login_form.png")
        );
    }

    #[tokio::test]
    async fn writes_png_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let run = RunId::new();
        let path = store
            .save_screenshot(&run, "step-01", "homepage", b"\x89PNG")
            .await
            .unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"\x89PNG");
    }
}
