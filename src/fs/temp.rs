//! Sibling temp artifacts.
//!
//! Temp files are always created in the same directory as the file they
//! stand in for, so renames between them stay on one filesystem. Names follow
//! the `.{filename}.{tag}-{random}.tmp` pattern.

use crate::error::{Result, UnlatchError};
use rand::Rng;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Generate a temp path next to `target`, tagged with `tag`.
pub fn sibling_temp_path(target: &Path, tag: &str) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            UnlatchError::UserError(format!("invalid file path '{}'", target.display()))
        })?;

    let nonce: u32 = rand::thread_rng().r#gen();
    Ok(parent.join(format!(".{}.{}-{:08x}.tmp", filename, tag, nonce)))
}

/// Write content to a file and sync to disk.
///
/// The file is removed again if the write or sync fails.
pub fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        UnlatchError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        UnlatchError::UserError(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        UnlatchError::UserError(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

/// Remove a leftover file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
