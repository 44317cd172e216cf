//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the unlatch engine.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Handle tool
    // =========================================================================
    /// Path or name of the handle-enumeration tool, used verbatim.
    #[serde(default = "default_tool_path")]
    pub tool_path: String,

    /// Encoding label tried first when decoding tool output.
    /// When unset, the locale encoding is detected from the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_encoding: Option<String>,

    // =========================================================================
    // Directory sampling
    // =========================================================================
    /// Directories with more files than this are sampled instead of swept.
    #[serde(default = "default_large_directory_threshold")]
    pub large_directory_threshold: usize,

    /// Sampling stops once this many locked files have been found.
    #[serde(default = "default_sample_lock_limit")]
    pub sample_lock_limit: usize,

    // =========================================================================
    // Timing
    // =========================================================================
    /// Pause before the first deletion attempt.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound of the wait-for-release loop.
    #[serde(default = "default_release_wait_ms")]
    pub release_wait_ms: u64,

    /// Interval of the wait-for-release loop.
    #[serde(default = "default_release_poll_ms")]
    pub release_poll_ms: u64,

    /// Alternative-unlock rounds on a locked file before deleting it.
    #[serde(default = "default_unlock_retry_attempts")]
    pub unlock_retry_attempts: u32,

    /// Delay step between alternative-unlock rounds (multiplied by the round).
    #[serde(default = "default_unlock_retry_step_ms")]
    pub unlock_retry_step_ms: u64,

    /// Tries per deletion method.
    #[serde(default = "default_method_attempts")]
    pub method_attempts: u32,

    /// Backoff step between tries of one deletion method (multiplied by the try).
    #[serde(default = "default_method_backoff_step_ms")]
    pub method_backoff_step_ms: u64,

    /// Pause between the two renames of the rename round-trip strategy.
    #[serde(default = "default_rename_settle_ms")]
    pub rename_settle_ms: u64,

    // =========================================================================
    // Process policy
    // =========================================================================
    /// Process names that are never terminated.
    #[serde(default = "default_critical_processes")]
    pub critical_processes: Vec<String>,

    /// Critical names that may be terminated while more than one instance runs.
    #[serde(default = "default_multi_instance_processes")]
    pub multi_instance_processes: Vec<String>,

    // =========================================================================
    // Trace
    // =========================================================================
    /// Append every trace event to this NDJSON file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_path: default_tool_path(),
            preferred_encoding: None,
            large_directory_threshold: default_large_directory_threshold(),
            sample_lock_limit: default_sample_lock_limit(),
            settle_delay_ms: default_settle_delay_ms(),
            release_wait_ms: default_release_wait_ms(),
            release_poll_ms: default_release_poll_ms(),
            unlock_retry_attempts: default_unlock_retry_attempts(),
            unlock_retry_step_ms: default_unlock_retry_step_ms(),
            method_attempts: default_method_attempts(),
            method_backoff_step_ms: default_method_backoff_step_ms(),
            rename_settle_ms: default_rename_settle_ms(),
            critical_processes: default_critical_processes(),
            multi_instance_processes: default_multi_instance_processes(),
            trace_file: None,
        }
    }
}

impl Config {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn release_poll(&self) -> Duration {
        Duration::from_millis(self.release_poll_ms)
    }

    pub fn rename_settle(&self) -> Duration {
        Duration::from_millis(self.rename_settle_ms)
    }

    /// Number of wait-for-release iterations (12 with the defaults).
    pub fn release_iterations(&self) -> u64 {
        (self.release_wait_ms / self.release_poll_ms.max(1)).max(1)
    }

    /// Delay after the given alternative-unlock round (1-based).
    pub fn unlock_retry_delay(&self, round: u32) -> Duration {
        Duration::from_millis(self.unlock_retry_step_ms * round as u64)
    }

    /// Backoff after the given try of a deletion method (1-based).
    pub fn method_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.method_backoff_step_ms * attempt as u64)
    }

    /// Defaults with every delay removed, for tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            settle_delay_ms: 0,
            release_poll_ms: 1,
            release_wait_ms: 3,
            unlock_retry_step_ms: 0,
            method_backoff_step_ms: 0,
            rename_settle_ms: 0,
            preferred_encoding: Some("utf-8".to_string()),
            ..Self::default()
        }
    }
}
