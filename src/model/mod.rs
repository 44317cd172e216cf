//! Value types shared by every engine component.
//!
//! All of these are plain values: each operation call receives its own list of
//! [`LockOwner`] and produces its own [`OperationResult`]. Nothing here is
//! cached across calls.

mod owner;
mod progress;
mod result;

pub use owner::{FILE_HANDLE_TYPE, LockOwner, UNKNOWN_OWNER_NAME};
pub use progress::{CancelToken, ProgressFn, ProgressReport, Reporter};
pub use result::OperationResult;
