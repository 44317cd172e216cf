//! Exit code constants for the unlatch CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, path not found)
//! - 2: Resource still busy after the full deletion cascade
//! - 3: Handle-enumeration tool missing or failing
//! - 4: A lock owner could not be terminated
//! - 5: Permission denied
//! - 130: Operation cancelled

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or a missing path.
pub const USER_ERROR: i32 = 1;

/// The path is still in use after every deletion method was exhausted.
pub const RESOURCE_BUSY: i32 = 2;

/// The handle-enumeration tool is unavailable or exited with an error.
pub const TOOL_FAILURE: i32 = 3;

/// One or more lock owners could not be terminated.
pub const TERMINATION_FAILURE: i32 = 4;

/// The current user lacks the rights to remove the path.
pub const PERMISSION_DENIED: i32 = 5;

/// The operation was cancelled before it completed.
pub const CANCELLED: i32 = 130;
