//! File move helper.
//!
//! A move is normally a plain `rename(2)`. Some mounts surface `EXDEV`
//! ("Invalid cross-device link") even when paths look local; for those we
//! fall back to copy + delete.

use crate::error::{Result, UnlatchError};
use std::fs;
use std::io;
use std::path::Path;

/// Move a single file from `source` to `destination`, replacing it.
pub fn move_file<P: AsRef<Path>, Q: AsRef<Path>>(source: P, destination: Q) -> Result<()> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_rename(&e) => move_file_cross_device(source, destination, e),
        Err(e) => Err(UnlatchError::UserError(format!(
            "failed to move file '{}' to '{}': {}",
            source.display(),
            destination.display(),
            e
        ))),
    }
}

fn move_file_cross_device(
    source: &Path,
    destination: &Path,
    original_error: io::Error,
) -> Result<()> {
    fs::copy(source, destination).map_err(|e| {
        UnlatchError::UserError(format!(
            "failed to copy '{}' for cross-device move: {} (original rename error: {})",
            source.display(),
            e,
            original_error
        ))
    })?;

    fs::remove_file(source).map_err(|e| {
        UnlatchError::UserError(format!(
            "moved file across devices but failed to delete source file '{}': {}",
            source.display(),
            e
        ))
    })?;

    Ok(())
}

fn is_cross_device_rename(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices || err.raw_os_error() == Some(18)
}
