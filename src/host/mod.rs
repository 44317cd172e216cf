//! Platform seam for everything that is not plain file I/O.
//!
//! The engine never spawns a process or calls a deletion primitive directly;
//! it goes through a [`Host`]. [`NativeHost`] talks to the real operating
//! system, and tests substitute a scripted fake.

pub mod command;
mod native;


pub use command::CommandOutput;
pub use native::NativeHost;

use crate::error::Result;
use std::ffi::OsStr;
use std::io;
use std::path::Path;

/// Whether a path names a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
}

impl PathKind {
    /// Classify an existing path; `None` if it does not exist.
    pub fn of(path: &Path) -> Option<Self> {
        let metadata = std::fs::symlink_metadata(path).ok()?;
        if metadata.is_dir() {
            Some(PathKind::Directory)
        } else {
            Some(PathKind::File)
        }
    }

    pub fn is_dir(self) -> bool {
        self == PathKind::Directory
    }
}

/// Operating-system primitives used by the engine.
pub trait Host: Send + Sync {
    /// Run the handle-enumeration tool against `target`.
    fn run_handle_tool(&self, tool: &str, target: &OsStr) -> io::Result<CommandOutput>;

    /// Whether a process with `pid` is currently running.
    fn is_process_running(&self, pid: u32) -> Result<bool>;

    /// Number of running processes with the given image name.
    fn instance_count(&self, image_name: &str) -> Result<usize>;

    /// Forcibly terminate the process with `pid`.
    fn terminate(&self, pid: u32) -> io::Result<CommandOutput>;

    /// Native unlink / recursive remove.
    fn remove_native(&self, path: &Path, kind: PathKind) -> io::Result<()>;

    /// Scripting-shell forced remove (recursive for directories).
    fn remove_scripted(&self, path: &Path, kind: PathKind) -> io::Result<CommandOutput>;

    /// OS command-line forced delete / recursive remove.
    fn remove_command_line(&self, path: &Path, kind: PathKind) -> io::Result<CommandOutput>;

    /// Type-branching cleanup script that swallows all errors.
    fn remove_fallback_script(&self, path: &Path) -> io::Result<CommandOutput>;

    /// Removal with elevated rights, used after a permission error.
    fn remove_elevated(&self, path: &Path) -> io::Result<CommandOutput>;

    /// Forced OS-level delete of a single file.
    fn force_delete_file(&self, path: &Path) -> io::Result<CommandOutput>;

    /// Whether `path` is currently held open exclusively.
    fn probe_exclusive(&self, path: &Path) -> bool {
        crate::probe::is_locked(path)
    }
}
