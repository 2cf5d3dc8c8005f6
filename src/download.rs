//! HuggingFace Hub checkpoint downloader.
//!
//! Fetches the UNet checkpoint into the install layout so a fresh checkout
//! only needs the LatentSync sources. The Hub cache
//! (`~/.cache/huggingface/hub` by default) keeps repeated runs offline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use hf_hub::api::sync::Api;

use crate::config::NodeConfig;

/// Organisation assumed for bare repository names.
const DEFAULT_ORG: &str = "ByteDance";

/// Expand bare names, e.g. `"LatentSync-1.5"` → `"ByteDance/LatentSync-1.5"`.
pub fn expand_repo_id(repo_id: &str) -> String {
    if repo_id.contains('/') {
        repo_id.to_string()
    } else {
        format!("{}/{}", DEFAULT_ORG, repo_id)
    }
}

/// File name to request from the Hub for the configured checkpoint.
fn hub_file_name(config: &NodeConfig) -> Result<String> {
    config
        .checkpoint_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| {
            format!(
                "Checkpoint path has no file name: {}",
                config.checkpoint_path.display()
            )
        })
}

/// Make sure the UNet checkpoint exists under the install directory,
/// downloading it from `config.hub_repo` when missing.
///
/// Returns the checkpoint's location in the install layout.
///
/// # Example
/// ```no_run
/// let config = latentsync_node::NodeConfig::with_install_dir("/opt/LatentSync");
/// let ckpt = latentsync_node::download::fetch_checkpoint(&config).unwrap();
/// assert!(ckpt.is_file());
/// ```
pub fn fetch_checkpoint(config: &NodeConfig) -> Result<PathBuf> {
    let target = config.checkpoint_file();
    if target.is_file() {
        tracing::info!("Checkpoint already present at {}", target.display());
        return Ok(target);
    }

    let repo_id = expand_repo_id(&config.hub_repo);
    let file_name = hub_file_name(config)?;

    tracing::info!("Downloading {} from {}…", file_name, repo_id);
    let api = Api::new().context("Failed to initialise HuggingFace Hub client")?;
    let cached = api
        .model(repo_id.clone())
        .get(&file_name)
        .with_context(|| format!("Failed to download '{}' from '{}'", file_name, repo_id))?;

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    std::fs::copy(&cached, &target).with_context(|| {
        format!(
            "Cannot copy {} to {}",
            cached.display(),
            target.display()
        )
    })?;

    tracing::info!("Checkpoint saved to {}", target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_repo_id() {
        assert_eq!(expand_repo_id("LatentSync-1.5"), "ByteDance/LatentSync-1.5");
        assert_eq!(expand_repo_id("me/fork"), "me/fork");
    }

    #[test]
    fn test_hub_file_name_from_layout() {
        let config = NodeConfig::default();
        assert_eq!(hub_file_name(&config).unwrap(), "latentsync_unet.pt");
    }

    #[test]
    fn test_present_checkpoint_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            // An unreachable repo proves no network call is made.
            hub_repo: "invalid/\u{0}".to_string(),
            ..NodeConfig::with_install_dir(dir.path())
        };
        std::fs::create_dir_all(dir.path().join("checkpoints")).unwrap();
        std::fs::write(config.checkpoint_file(), b"ckpt").unwrap();

        assert_eq!(fetch_checkpoint(&config).unwrap(), config.checkpoint_file());
    }
}
