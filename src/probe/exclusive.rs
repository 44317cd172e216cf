//! Exclusive-access probe.
//!
//! A file is "locked" when it cannot be opened for shared read, or can be read
//! but not opened for append. Every failure counts as locked; callers
//! re-verify before doing anything destructive.

use std::fs::{File, OpenOptions};
use std::path::Path;

/// Whether `path` is currently locked against this process.
///
/// Directories and missing paths report `true`.
pub fn is_locked(path: &Path) -> bool {
    if File::open(path).is_err() {
        return true;
    }
    OpenOptions::new().append(true).open(path).is_err()
}
