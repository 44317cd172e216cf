//! Path normalisation.

use crate::error::{Result, UnlatchError};
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute and lexically normalised (`.` and `..` resolved).
///
/// Symlinks are not resolved; the handle tool must see the path the caller
/// asked about.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| {
        UnlatchError::UserError(format!(
            "failed to resolve absolute path for '{}': {}",
            path.display(),
            e
        ))
    })?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// The final component of `path`, or the path itself if it has none.
pub fn file_name_only(path: &Path) -> PathBuf {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
}
