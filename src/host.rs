//! What the node needs from the editor process hosting it.

use std::path::PathBuf;

/// Host-provided services.
pub trait HostEnvironment {
    /// Directory for per-invocation scratch output.
    fn temp_directory(&self) -> PathBuf;
}

/// Uses the platform temp root.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTemp;

impl HostEnvironment for SystemTemp {
    fn temp_directory(&self) -> PathBuf {
        std::env::temp_dir()
    }
}

/// Uses a fixed directory, typically the editor's own `temp/` folder.
#[derive(Debug, Clone)]
pub struct FixedTempDir(pub PathBuf);

impl HostEnvironment for FixedTempDir {
    fn temp_directory(&self) -> PathBuf {
        self.0.clone()
    }
}
