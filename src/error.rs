//! Error types for unlatch.
//!
//! Every component returns a typed result; low-level subprocess and OS errors
//! are converted into one of these kinds at the boundary of each primitive.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for unlatch operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnlatchError {
    /// The target path does not exist.
    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The handle-enumeration tool could not be started.
    #[error("handle tool unavailable: {0}")]
    ToolUnavailable(String),

    /// The handle-enumeration tool exited with an error unrelated to "no matches".
    #[error("handle tool failed: {0}")]
    ToolExecutionFailed(String),

    /// One or more lock owners could not be terminated.
    #[error("process termination failed: {0}")]
    ProcessTerminationFailed(String),

    /// A critical process was left running. Informational, not a hard error.
    #[error("critical process skipped: {0}")]
    CriticalProcessSkipped(String),

    /// The current user lacks the rights to perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The path is still in use after every deletion method was exhausted.
    #[error("resource busy: {0}")]
    ResourceBusy(String),

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// Anything that does not fit another kind.
    #[error("{0}")]
    Unknown(String),
}

/// Copyable discriminant of [`UnlatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PathNotFound,
    ToolUnavailable,
    ToolExecutionFailed,
    ProcessTerminationFailed,
    CriticalProcessSkipped,
    PermissionDenied,
    ResourceBusy,
    Cancelled,
    UserError,
    Unknown,
}

impl UnlatchError {
    /// Returns the kind of this error without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnlatchError::PathNotFound(_) => ErrorKind::PathNotFound,
            UnlatchError::ToolUnavailable(_) => ErrorKind::ToolUnavailable,
            UnlatchError::ToolExecutionFailed(_) => ErrorKind::ToolExecutionFailed,
            UnlatchError::ProcessTerminationFailed(_) => ErrorKind::ProcessTerminationFailed,
            UnlatchError::CriticalProcessSkipped(_) => ErrorKind::CriticalProcessSkipped,
            UnlatchError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            UnlatchError::ResourceBusy(_) => ErrorKind::ResourceBusy,
            UnlatchError::Cancelled => ErrorKind::Cancelled,
            UnlatchError::UserError(_) => ErrorKind::UserError,
            UnlatchError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            UnlatchError::PathNotFound(_) => exit_codes::USER_ERROR,
            UnlatchError::ToolUnavailable(_) => exit_codes::TOOL_FAILURE,
            UnlatchError::ToolExecutionFailed(_) => exit_codes::TOOL_FAILURE,
            UnlatchError::ProcessTerminationFailed(_) => exit_codes::TERMINATION_FAILURE,
            UnlatchError::CriticalProcessSkipped(_) => exit_codes::SUCCESS,
            UnlatchError::PermissionDenied(_) => exit_codes::PERMISSION_DENIED,
            UnlatchError::ResourceBusy(_) => exit_codes::RESOURCE_BUSY,
            UnlatchError::Cancelled => exit_codes::CANCELLED,
            UnlatchError::UserError(_) => exit_codes::USER_ERROR,
            UnlatchError::Unknown(_) => exit_codes::USER_ERROR,
        }
    }

    /// Whether the only remaining remedy is a reboot.
    pub fn suggests_reboot(&self) -> bool {
        matches!(self, UnlatchError::ResourceBusy(_))
    }
}

/// Result type alias for unlatch operations.
pub type Result<T> = std::result::Result<T, UnlatchError>;
