//! Lock owner records produced by the prober.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The only handle kind the prober surfaces.
pub const FILE_HANDLE_TYPE: &str = "File";

/// Display name of the synthetic owner attached to a confirmed lock that no
/// process could be attributed to.
pub const UNKNOWN_OWNER_NAME: &str = "unknown owner (possibly the desktop shell)";

/// One process holding an open handle on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOwner {
    /// Display name of the owning process.
    pub process_name: String,

    /// Process id. `0` is reserved for the synthetic placeholder and is never
    /// passed to process termination.
    pub pid: u32,

    /// Handle classification; always [`FILE_HANDLE_TYPE`].
    pub handle_type: String,

    /// Best-effort path the handle refers to.
    pub file_path: PathBuf,
}

impl LockOwner {
    /// Create an owner for a real process holding a file handle.
    pub fn new(process_name: impl Into<String>, pid: u32, file_path: impl Into<PathBuf>) -> Self {
        Self {
            process_name: process_name.into(),
            pid,
            handle_type: FILE_HANDLE_TYPE.to_string(),
            file_path: file_path.into(),
        }
    }

    /// Create the synthetic "owner unknown" entry for a locked path.
    pub fn placeholder(file_path: &Path) -> Self {
        Self::new(UNKNOWN_OWNER_NAME, 0, file_path)
    }

    /// Whether this is the synthetic placeholder rather than a real process.
    pub fn is_placeholder(&self) -> bool {
        self.pid == 0
    }

    /// `name (PID: n)` label used in composite messages.
    pub fn label(&self) -> String {
        format!("{} (PID: {})", self.process_name, self.pid)
    }
}

impl std::fmt::Display for LockOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.label(),
            self.handle_type,
            self.file_path.display()
        )
    }
}
