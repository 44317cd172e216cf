//! Test doubles and fixtures shared by the subsystem tests.

use crate::config::Config;
use crate::error::{Result, UnlatchError};
use crate::events::Trace;
use crate::host::{CommandOutput, Host, PathKind};
use crate::probe::ProbeGate;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

/// One call made against a [`FakeHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostCall {
    Tool(OsString),
    IsRunning(u32),
    InstanceCount(String),
    Terminate(u32),
    Remove(Primitive, PathBuf),
}

/// Deletion primitives of the host seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Primitive {
    Native,
    Scripted,
    CommandLine,
    FallbackScript,
    Elevated,
    ForceDelete,
}

/// How a fake deletion primitive behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    /// Remove the path from disk and report success.
    Delete,
    /// Leave the path and report a permission error.
    Deny,
    /// Leave the path and report a sharing violation.
    Busy,
}

#[derive(Debug, Clone)]
enum ToolReply {
    Output(CommandOutput),
    Missing,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<HostCall>,
    tool_by_target: HashMap<OsString, CommandOutput>,
    tool_queue: VecDeque<ToolReply>,
    processes: BTreeMap<u32, String>,
    unkillable: HashSet<u32>,
    liveness_fails: bool,
    instance_query_fails: bool,
    locks: HashMap<PathBuf, u32>,
    behaviors: HashMap<Primitive, Behavior>,
}

/// Scripted [`Host`] that records every call and never touches real processes.
///
/// Deletion primitives default to [`Behavior::Delete`] on the real temp tree;
/// locks are tracked in memory and released when their holder is terminated.
#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    state: Mutex<FakeState>,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Register a running process.
    pub(crate) fn with_process(self, pid: u32, name: &str) -> Self {
        self.state().processes.insert(pid, name.to_string());
        self
    }

    /// Make termination of `pid` fail.
    pub(crate) fn unkillable(self, pid: u32) -> Self {
        self.state().unkillable.insert(pid);
        self
    }

    /// Mark `path` as exclusively held by `pid` (0 for an unknown holder).
    pub(crate) fn with_lock(self, path: &Path, pid: u32) -> Self {
        self.state().locks.insert(path.to_path_buf(), pid);
        self
    }

    pub(crate) fn with_behavior(self, primitive: Primitive, behavior: Behavior) -> Self {
        self.state().behaviors.insert(primitive, behavior);
        self
    }

    /// Every primitive of the deletion cascade fails with `behavior`.
    pub(crate) fn all_removals(self, behavior: Behavior) -> Self {
        {
            let mut state = self.state();
            for primitive in [
                Primitive::Native,
                Primitive::Scripted,
                Primitive::CommandLine,
                Primitive::FallbackScript,
                Primitive::Elevated,
                Primitive::ForceDelete,
            ] {
                state.behaviors.insert(primitive, behavior);
            }
        }
        self
    }

    pub(crate) fn liveness_fails(self) -> Self {
        self.state().liveness_fails = true;
        self
    }

    pub(crate) fn instance_query_fails(self) -> Self {
        self.state().instance_query_fails = true;
        self
    }

    /// Tool output returned whenever `target` is queried.
    pub(crate) fn tool_output_for(self, target: impl AsRef<OsStr>, stdout: &str) -> Self {
        self.state().tool_by_target.insert(
            target.as_ref().to_os_string(),
            CommandOutput::ok(stdout.as_bytes()),
        );
        self
    }

    /// Queue one tool reply; queued replies are used before the default.
    pub(crate) fn queue_tool(self, output: CommandOutput) -> Self {
        self.state().tool_queue.push_back(ToolReply::Output(output));
        self
    }

    /// The next tool invocation fails to start.
    pub(crate) fn tool_missing(self) -> Self {
        self.state().tool_queue.push_back(ToolReply::Missing);
        self
    }

    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.state().calls.clone()
    }

    pub(crate) fn terminated(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Terminate(pid) => Some(pid),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn tool_runs(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, HostCall::Tool(_)))
            .count()
    }

    pub(crate) fn removals(&self) -> Vec<Primitive> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Remove(primitive, _) => Some(primitive),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn is_running(&self, pid: u32) -> bool {
        self.state().processes.contains_key(&pid)
    }

    pub(crate) fn release(&self, path: &Path) {
        self.state().locks.remove(path);
    }

    fn remove(&self, primitive: Primitive, path: &Path) -> io::Result<()> {
        let behavior = {
            let mut state = self.state();
            state
                .calls
                .push(HostCall::Remove(primitive, path.to_path_buf()));
            state
                .behaviors
                .get(&primitive)
                .copied()
                .unwrap_or(Behavior::Delete)
        };

        match behavior {
            Behavior::Delete => {
                let result = match PathKind::of(path) {
                    Some(PathKind::Directory) => std::fs::remove_dir_all(path),
                    Some(PathKind::File) => std::fs::remove_file(path),
                    None => Ok(()),
                };
                if result.is_ok() {
                    self.release(path);
                }
                result
            }
            Behavior::Deny => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Access is denied.",
            )),
            Behavior::Busy => Err(io::Error::other(
                "The process cannot access the file because it is being used by another process.",
            )),
        }
    }

    fn remove_command(&self, primitive: Primitive, path: &Path) -> io::Result<CommandOutput> {
        Ok(match self.remove(primitive, path) {
            Ok(()) => CommandOutput::ok(Vec::new()),
            Err(e) => CommandOutput::failed(1, e.to_string()),
        })
    }
}

impl Host for FakeHost {
    fn run_handle_tool(&self, _tool: &str, target: &OsStr) -> io::Result<CommandOutput> {
        let mut state = self.state();
        state.calls.push(HostCall::Tool(target.to_os_string()));

        if let Some(output) = state.tool_by_target.get(target) {
            return Ok(output.clone());
        }
        match state.tool_queue.pop_front() {
            Some(ToolReply::Output(output)) => Ok(output),
            Some(ToolReply::Missing) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "program not found",
            )),
            None => Ok(CommandOutput::ok("No matching handles found.\n")),
        }
    }

    fn is_process_running(&self, pid: u32) -> Result<bool> {
        let mut state = self.state();
        state.calls.push(HostCall::IsRunning(pid));
        if state.liveness_fails {
            return Err(UnlatchError::Unknown("process listing failed".to_string()));
        }
        Ok(state.processes.contains_key(&pid))
    }

    fn instance_count(&self, image_name: &str) -> Result<usize> {
        let mut state = self.state();
        state
            .calls
            .push(HostCall::InstanceCount(image_name.to_string()));
        if state.instance_query_fails {
            return Err(UnlatchError::Unknown("process listing failed".to_string()));
        }
        Ok(state
            .processes
            .values()
            .filter(|name| name.eq_ignore_ascii_case(image_name))
            .count())
    }

    fn terminate(&self, pid: u32) -> io::Result<CommandOutput> {
        let mut state = self.state();
        state.calls.push(HostCall::Terminate(pid));

        if state.unkillable.contains(&pid) {
            return Ok(CommandOutput::failed(1, "ERROR: Access is denied."));
        }
        if state.processes.remove(&pid).is_none() {
            return Ok(CommandOutput::failed(128, "ERROR: The process was not found."));
        }
        state.locks.retain(|_, holder| *holder != pid);
        Ok(CommandOutput::ok("SUCCESS: terminated"))
    }

    fn remove_native(&self, path: &Path, _kind: PathKind) -> io::Result<()> {
        self.remove(Primitive::Native, path)
    }

    fn remove_scripted(&self, path: &Path, _kind: PathKind) -> io::Result<CommandOutput> {
        self.remove_command(Primitive::Scripted, path)
    }

    fn remove_command_line(&self, path: &Path, _kind: PathKind) -> io::Result<CommandOutput> {
        self.remove_command(Primitive::CommandLine, path)
    }

    fn remove_fallback_script(&self, path: &Path) -> io::Result<CommandOutput> {
        // The fallback script swallows its own errors.
        let _ = self.remove(Primitive::FallbackScript, path);
        Ok(CommandOutput::ok(Vec::new()))
    }

    fn remove_elevated(&self, path: &Path) -> io::Result<CommandOutput> {
        self.remove_command(Primitive::Elevated, path)
    }

    fn force_delete_file(&self, path: &Path) -> io::Result<CommandOutput> {
        self.remove_command(Primitive::ForceDelete, path)
    }

    fn probe_exclusive(&self, path: &Path) -> bool {
        self.state().locks.contains_key(path)
    }
}

/// Collaborators most engine components need, wired to a [`FakeHost`].
pub(crate) struct Fixture {
    pub config: Config,
    pub host: FakeHost,
    pub gate: ProbeGate,
    pub trace: Trace,
}

impl Fixture {
    pub(crate) fn new(host: FakeHost) -> Self {
        Self {
            config: Config::for_tests(),
            host,
            gate: ProbeGate::new(),
            trace: Trace::new(),
        }
    }
}

/// A temp directory holding `count` small files named `file-NNNN.txt`.
pub(crate) fn create_tree(count: usize) -> (TempDir, Vec<PathBuf>) {
    let temp_dir = TempDir::new().unwrap();
    let files = (0..count)
        .map(|i| {
            let path = temp_dir.path().join(format!("file-{:04}.txt", i));
            std::fs::write(&path, format!("content {}\n", i)).unwrap();
            path
        })
        .collect();
    (temp_dir, files)
}

/// A temp directory with a single file.
pub(crate) fn create_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (temp_dir, path)
}
