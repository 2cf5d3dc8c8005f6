//! Path input cleanup and output naming.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::error::{LipsyncError, Result};

/// Characters stripped from both ends of a path typed into the editor.
const QUOTES: [char; 2] = ['"', '\''];

/// Trim whitespace and surrounding quotes from a path widget value.
///
/// Returns `EmptyInput` when nothing is left. Paths pasted from a file
/// manager often arrive as `"C:\clips\a.mp4"` or with a trailing newline.
pub fn clean_path_input(raw: &str, field: &'static str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(LipsyncError::EmptyInput { field });
    }
    let cleaned = raw.trim().trim_matches(&QUOTES[..]);
    if cleaned.trim().is_empty() {
        return Err(LipsyncError::EmptyInput { field });
    }
    Ok(PathBuf::from(cleaned))
}

/// `<prefix>_<YYYYmmdd_HHMMSS>_<8 hex chars>.<extension>`
pub fn output_file_name(prefix: &str, extension: &str, now: DateTime<Local>) -> String {
    let unique = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}.{}",
        prefix,
        now.format("%Y%m%d_%H%M%S"),
        &unique[..8],
        extension
    )
}

/// Fail with the error built by `missing` unless `path` is an existing file.
pub(crate) fn require_file(
    path: &Path,
    missing: impl FnOnce(PathBuf) -> LipsyncError,
) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(missing(path.to_path_buf()))
    }
}

/// Best-effort removal; a file that is already gone is not an error.
pub(crate) fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove {}: {}", path.display(), e),
    }
}
