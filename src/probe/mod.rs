//! Lock Prober.
//!
//! Runs the handle-enumeration tool against a path and turns its output into
//! [`LockOwner`] records. Large directories go through the sampler instead of
//! a full scan; a directory the tool reports as free is swept file by file.
//!
//! # Probe flow
//!
//! 1. Take the [`ProbeGate`]; only one probe runs at a time.
//! 2. Resolve the absolute, normalised path.
//! 3. Directories above the size threshold are sampled.
//! 4. Run the tool. A license prompt gets one retry; any other error exit
//!    that is not "no matches" fails the probe.
//! 5. Files the tool knows nothing about are retried by base name.
//! 6. A lock nobody claims yields a placeholder owner with pid 0.

pub mod decode;
mod exclusive;
mod gate;
pub mod parse;
mod sampler;

#[cfg(test)]
mod tests;

pub use exclusive::is_locked;
pub use gate::ProbeGate;
pub(crate) use sampler::collect_files;

use crate::config::Config;
use crate::error::{Result, UnlatchError};
use crate::events::{Event, EventAction, Trace};
use crate::fs::{file_name_only, normalize_path};
use crate::host::{CommandOutput, Host, PathKind};
use crate::model::{LockOwner, Reporter};
use decode::decode_output;
use parse::{EULA_MARKER, NO_MATCHES, parse_output};
use serde_json::json;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Finds the processes holding a path open.
pub struct LockProber<'a> {
    config: &'a Config,
    host: &'a dyn Host,
    gate: &'a ProbeGate,
    trace: &'a Trace,
}

/// Decoded output of one tool invocation.
struct ToolRun {
    output: CommandOutput,
    stdout: String,
    stderr: String,
}

impl ToolRun {
    fn no_matches(&self) -> bool {
        self.stdout.contains(NO_MATCHES) || self.stderr.contains(NO_MATCHES)
    }

    fn mentions_eula(&self) -> bool {
        self.stdout.contains(EULA_MARKER) || self.stderr.contains(EULA_MARKER)
    }

    fn failed(&self) -> bool {
        !self.output.success() && !self.no_matches()
    }

    fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Owners attributed by one query.
struct ToolPass {
    owners: Vec<LockOwner>,
    no_matches: bool,
}

impl<'a> LockProber<'a> {
    pub fn new(config: &'a Config, host: &'a dyn Host, gate: &'a ProbeGate, trace: &'a Trace) -> Self {
        Self {
            config,
            host,
            gate,
            trace,
        }
    }

    /// List the processes holding `path` open.
    ///
    /// An empty list means nothing holds the path. Tool failures, a missing
    /// path and cancellation are returned as errors.
    pub fn probe(&self, path: &Path, reporter: &mut Reporter) -> Result<Vec<LockOwner>> {
        let _gate = self.gate.acquire();

        let kind =
            PathKind::of(path).ok_or_else(|| UnlatchError::PathNotFound(path.to_path_buf()))?;
        let target = normalize_path(path)?;
        info!(path = %target.display(), "probing for lock owners");

        if kind.is_dir() {
            return self.probe_directory(&target, reporter);
        }

        let pass = self.query(target.as_os_str(), &target)?;
        if !pass.owners.is_empty() {
            return Ok(pass.owners);
        }

        if pass.no_matches {
            let base_name = file_name_only(&target);
            debug!(name = %base_name.display(), "retrying probe by base name");
            let retry = self.query(base_name.as_os_str(), &target)?;
            if !retry.owners.is_empty() {
                return Ok(retry.owners);
            }
        }

        if self.host.probe_exclusive(&target) {
            warn!(path = %target.display(), "file is locked but no owner was reported");
            return Ok(vec![LockOwner::placeholder(&target)]);
        }

        Ok(Vec::new())
    }

    /// Probe a large directory by sampling; see the `sampler` module.
    pub fn probe_large_directory(
        &self,
        dir: &Path,
        reporter: &mut Reporter,
    ) -> Result<Vec<LockOwner>> {
        let _gate = self.gate.acquire();
        if !dir.is_dir() {
            return Err(UnlatchError::PathNotFound(dir.to_path_buf()));
        }
        let dir = normalize_path(dir)?;
        let files = sampler::collect_files(&dir);
        self.sample_directory(&dir, files, reporter)
    }

    fn probe_directory(&self, dir: &Path, reporter: &mut Reporter) -> Result<Vec<LockOwner>> {
        let files = sampler::collect_files(dir);
        if files.len() > self.config.large_directory_threshold {
            return self.sample_directory(dir, files, reporter);
        }

        let pass = self.query(dir.as_os_str(), dir)?;
        if !pass.owners.is_empty() {
            return Ok(pass.owners);
        }

        debug!(
            path = %dir.display(),
            no_matches = pass.no_matches,
            files = files.len(),
            "no directory-level owners; sweeping files"
        );
        self.sweep_directory(files, reporter)
    }

    /// Run the tool with `arg` and parse its owners, attributing unparsed
    /// paths to `queried`.
    fn query(&self, arg: &OsStr, queried: &Path) -> Result<ToolPass> {
        let mut run = self.run_tool(arg)?;

        if run.failed() && run.mentions_eula() {
            warn!("handle tool printed a license prompt; retrying once");
            run = self.run_tool(arg)?;
        }

        if run.failed() {
            return Err(UnlatchError::ToolExecutionFailed(run.error_text()));
        }

        let owners = parse_output(&run.stdout, queried);
        debug!(owners = owners.len(), no_matches = run.no_matches(), "parsed tool output");
        Ok(ToolPass {
            owners,
            no_matches: run.no_matches(),
        })
    }

    fn run_tool(&self, arg: &OsStr) -> Result<ToolRun> {
        let tool = self.config.tool_path.as_str();
        let output = self.host.run_handle_tool(tool, arg).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                UnlatchError::ToolUnavailable(format!("'{}' could not be started: {}", tool, e))
            } else {
                UnlatchError::ToolExecutionFailed(format!("failed to run '{}': {}", tool, e))
            }
        })?;

        let preferred = self.config.preferred_encoding.as_deref();
        let run = ToolRun {
            stdout: decode_output(&output.stdout, preferred),
            stderr: decode_output(&output.stderr, preferred),
            output,
        };

        self.trace.record(
            Event::new(EventAction::ToolRun)
                .with_path(Path::new(arg))
                .with_details(json!({
                    "tool": tool,
                    "code": run.output.code,
                    "no_matches": run.no_matches(),
                })),
        );
        Ok(run)
    }
}
