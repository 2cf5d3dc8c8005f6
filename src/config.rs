//! Node settings and the UNet configuration object.
//!
//! [`NodeConfig`] describes where a LatentSync installation lives and how the
//! node talks to it. It deserialises from a JSON file with every field
//! optional:
//!
//! ```json
//! {
//!   "install_dir": "/opt/LatentSync",
//!   "remove_source_video": false,
//!   "python": "/opt/LatentSync/.venv/bin/python"
//! }
//! ```
//!
//! [`UnetConfig`] is the YAML document handed to the inference collaborator
//! (`configs/unet/stage2.yaml` in a stock installation).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{LipsyncError, Result};

/// Checkpoint location relative to the install directory.
pub const DEFAULT_CHECKPOINT_PATH: &str = "checkpoints/latentsync_unet.pt";

/// UNet config location relative to the install directory.
pub const DEFAULT_UNET_CONFIG_PATH: &str = "configs/unet/stage2.yaml";

/// HuggingFace repository hosting the UNet checkpoint.
pub const DEFAULT_HUB_REPO: &str = "ByteDance/LatentSync-1.5";

// ─────────────────────────────────────────────────────────────────────────────
// NodeConfig
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// Root of the LatentSync installation.
    pub install_dir: PathBuf,

    /// UNet checkpoint, relative to `install_dir` unless absolute.
    pub checkpoint_path: PathBuf,

    /// UNet YAML config, relative to `install_dir` unless absolute.
    pub unet_config_path: PathBuf,

    /// Output file name prefix.
    pub output_prefix: String,

    /// Output container extension, without the dot.
    pub output_extension: String,

    /// Delete the caller's input video after a waveform invocation.
    pub remove_source_video: bool,

    /// Interpreter used by [`CommandBackend`](crate::backend::CommandBackend).
    pub python: String,

    /// Module run with `python -m`.
    pub inference_module: String,

    /// Repository used by [`fetch_checkpoint`](crate::download::fetch_checkpoint).
    pub hub_repo: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("."),
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT_PATH),
            unet_config_path: PathBuf::from(DEFAULT_UNET_CONFIG_PATH),
            output_prefix: "latentsync".to_string(),
            output_extension: "mp4".to_string(),
            remove_source_video: false,
            python: "python".to_string(),
            inference_module: "scripts.inference".to_string(),
            hub_repo: DEFAULT_HUB_REPO.to_string(),
        }
    }
}

impl NodeConfig {
    /// Default settings rooted at `install_dir`.
    pub fn with_install_dir(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            ..Self::default()
        }
    }

    /// Read settings from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Absolute location of the UNet checkpoint.
    pub fn checkpoint_file(&self) -> PathBuf {
        self.install_dir.join(&self.checkpoint_path)
    }

    /// Absolute location of the UNet YAML config.
    pub fn unet_config_file(&self) -> PathBuf {
        self.install_dir.join(&self.unet_config_path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UnetConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Loaded UNet configuration. The node only reads a few well-known keys for
/// logging; its meaning belongs to the inference pipeline.
#[derive(Debug, Clone)]
pub struct UnetConfig {
    path: PathBuf,
    root: Value,
}

impl UnetConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(path, &text)
    }

    pub fn from_yaml_str(path: &Path, text: &str) -> Result<Self> {
        let root = serde_yaml::from_str(text).map_err(|source| LipsyncError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a dotted key such as `"data.num_frames"`.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.root, |node, part| node.get(part))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE2: &str = "\
data:
  num_frames: 16
  resolution: 256
  audio_sample_rate: 16000
run:
  inference_steps: 20
";

    #[test]
    fn test_default_layout() {
        let config = NodeConfig::with_install_dir("/opt/LatentSync");
        assert_eq!(
            config.checkpoint_file(),
            PathBuf::from("/opt/LatentSync/checkpoints/latentsync_unet.pt")
        );
        assert_eq!(
            config.unet_config_file(),
            PathBuf::from("/opt/LatentSync/configs/unet/stage2.yaml")
        );
        assert!(!config.remove_source_video);
    }

    #[test]
    fn test_absolute_overrides_win() {
        let config = NodeConfig {
            checkpoint_path: PathBuf::from("/models/unet.pt"),
            ..NodeConfig::with_install_dir("/opt/LatentSync")
        };
        assert_eq!(config.checkpoint_file(), PathBuf::from("/models/unet.pt"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        std::fs::write(
            &path,
            r#"{"install_dir": "/srv/ls", "remove_source_video": true}"#,
        )
        .unwrap();

        let config = NodeConfig::from_json_file(&path).unwrap();
        assert_eq!(config.install_dir, PathBuf::from("/srv/ls"));
        assert!(config.remove_source_video);
        assert_eq!(config.output_extension, "mp4");
        assert_eq!(config.inference_module, "scripts.inference");
    }

    #[test]
    fn test_missing_settings_file() {
        let err = NodeConfig::from_json_file(Path::new("/nonexistent/node.json")).unwrap_err();
        assert!(
            matches!(&err, LipsyncError::Io(e) if e.kind() == std::io::ErrorKind::NotFound),
            "{err}"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn test_unet_lookup() {
        let config = UnetConfig::from_yaml_str(Path::new("stage2.yaml"), STAGE2).unwrap();
        assert_eq!(
            config.lookup("data.num_frames").and_then(Value::as_u64),
            Some(16)
        );
        assert_eq!(
            config.lookup("run.inference_steps").and_then(Value::as_u64),
            Some(20)
        );
        assert!(config.lookup("data.missing").is_none());
    }

    #[test]
    fn test_unet_parse_error_names_file() {
        let err = UnetConfig::from_yaml_str(Path::new("bad.yaml"), "data: [unclosed").unwrap_err();
        assert!(matches!(err, LipsyncError::ConfigParse { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }
}
