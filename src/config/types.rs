//! Default values for the Config struct.
//!
//! The timing defaults mirror the delays the engine has always used: a three
//! second settling pause before deleting, a six second release window polled
//! every half second, and linearly growing backoff between retries.

/// Core OS processes whose termination would destabilise the session.
#[cfg(windows)]
pub fn default_critical_processes() -> Vec<String> {
    [
        "System",
        "smss.exe",
        "csrss.exe",
        "wininit.exe",
        "winlogon.exe",
        "services.exe",
        "lsass.exe",
        "svchost.exe",
        "dwm.exe",
        "explorer.exe",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Core OS processes whose termination would destabilise the session.
#[cfg(not(windows))]
pub fn default_critical_processes() -> Vec<String> {
    [
        "init",
        "systemd",
        "launchd",
        "kthreadd",
        "systemd-logind",
        "dbus-daemon",
        "loginwindow",
        "WindowServer",
        "Xorg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Deny-listed processes that normally run several instances per session.
#[cfg(windows)]
pub fn default_multi_instance_processes() -> Vec<String> {
    vec!["explorer.exe".to_string(), "svchost.exe".to_string()]
}

/// Deny-listed processes that normally run several instances per session.
#[cfg(not(windows))]
pub fn default_multi_instance_processes() -> Vec<String> {
    vec!["dbus-daemon".to_string(), "Xorg".to_string()]
}

// Default value functions for serde
pub(crate) fn default_tool_path() -> String {
    if cfg!(windows) {
        "handle64.exe".to_string()
    } else {
        "handle".to_string()
    }
}
pub(crate) fn default_large_directory_threshold() -> usize {
    100
}
pub(crate) fn default_sample_lock_limit() -> usize {
    5
}
pub(crate) fn default_settle_delay_ms() -> u64 {
    3000
}
pub(crate) fn default_release_wait_ms() -> u64 {
    6000
}
pub(crate) fn default_release_poll_ms() -> u64 {
    500
}
pub(crate) fn default_unlock_retry_attempts() -> u32 {
    3
}
pub(crate) fn default_unlock_retry_step_ms() -> u64 {
    1000
}
pub(crate) fn default_method_attempts() -> u32 {
    3
}
pub(crate) fn default_method_backoff_step_ms() -> u64 {
    500
}
pub(crate) fn default_rename_settle_ms() -> u64 {
    500
}
