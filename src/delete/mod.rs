//! Deletion Cascade.
//!
//! `delete` removes a file or directory using an ordered list of
//! increasingly aggressive primitives:
//!
//! 1. native remove
//! 2. scripting-shell forced remove
//! 3. OS command-line forced delete
//! 4. type-branching fallback script that swallows its own errors
//!
//! Before the cascade, locked files get a few rounds of alternative unlock
//! and directories are emptied bottom-up. A permission error anywhere arms
//! one elevated-rights removal at the end. If the path survives everything,
//! the result is `ResourceBusy` with a reboot hint.

mod cascade;


use crate::config::Config;
use crate::error::{Result, UnlatchError};
use crate::events::{Event, EventAction, Trace};
use crate::host::{Host, PathKind};
use crate::model::{OperationResult, Reporter};
use crate::unlock::AlternativeUnlocker;
use cascade::{Attempt, CascadeOutcome, Method, gone, run_methods};
use serde_json::json;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Removes paths through the method cascade.
pub struct DeletionCascade<'a> {
    config: &'a Config,
    host: &'a dyn Host,
    trace: &'a Trace,
    alternative: AlternativeUnlocker<'a>,
}

impl<'a> DeletionCascade<'a> {
    pub fn new(config: &'a Config, host: &'a dyn Host, trace: &'a Trace) -> Self {
        Self {
            config,
            host,
            trace,
            alternative: AlternativeUnlocker::new(config, host, trace),
        }
    }

    /// Delete `path`, reporting progress while a directory is emptied.
    pub fn delete(&self, path: &Path, reporter: &mut Reporter) -> OperationResult {
        let Some(kind) = PathKind::of(path) else {
            return OperationResult::failure(UnlatchError::PathNotFound(path.to_path_buf()));
        };

        info!(path = %path.display(), ?kind, "deleting");
        std::thread::sleep(self.config.settle_delay());
        if let Err(e) = reporter.checkpoint() {
            return e.into();
        }

        let total = match kind {
            PathKind::File => {
                if self.unlock_file(path) {
                    return OperationResult::success(format!(
                        "Deleted {} while releasing it",
                        path.display()
                    ));
                }
                0
            }
            PathKind::Directory => match self.empty_directory(path, true, reporter) {
                Ok(total) => total,
                Err(e) => return e.into(),
            },
        };

        let result = self.remove(path, kind, &self.standard_methods());
        if result.is_success() && total > 0 {
            let _ = reporter.report(total, total);
        }
        result
    }

    /// The cascade alone, plus a directory-contents sweep, for a path whose
    /// owners were already released.
    pub fn delete_released(&self, path: &Path) -> OperationResult {
        let Some(kind) = PathKind::of(path) else {
            return OperationResult::failure(UnlatchError::PathNotFound(path.to_path_buf()));
        };

        let mut methods = self.standard_methods();
        if kind.is_dir() {
            methods.push(Method::new("contents_sweep", |p, _| {
                let _ = self.empty_directory(p, false, &mut Reporter::silent());
                Attempt::from_io(self.host.remove_native(p, PathKind::Directory))
            }));
        }
        self.remove(path, kind, &methods)
    }

    fn standard_methods(&self) -> Vec<Method<'a>> {
        let host = self.host;
        vec![
            Method::new("native_remove", move |p, k| {
                Attempt::from_io(host.remove_native(p, k))
            }),
            Method::new("scripted_remove", move |p, k| {
                Attempt::from_command(host.remove_scripted(p, k))
            }),
            Method::new("command_line_remove", move |p, k| {
                Attempt::from_command(host.remove_command_line(p, k))
            }),
            Method::new("fallback_script", move |p, _| {
                Attempt::from_command(host.remove_fallback_script(p))
            }),
        ]
    }

    fn remove(&self, path: &Path, kind: PathKind, methods: &[Method<'_>]) -> OperationResult {
        match run_methods(self.config, self.trace, path, kind, methods) {
            CascadeOutcome::Removed { method } => {
                OperationResult::success(format!("Deleted {} ({})", path.display(), method))
            }
            CascadeOutcome::Exhausted {
                permission_denied: true,
                last_error,
            } => self.remove_elevated(path, last_error),
            CascadeOutcome::Exhausted { last_error, .. } => {
                warn!(path = %path.display(), error = ?last_error, "every deletion method failed");
                OperationResult::failure(UnlatchError::ResourceBusy(format!(
                    "'{}' is still in use after every deletion method. Try restarting the computer.",
                    path.display()
                )))
            }
        }
    }

    fn remove_elevated(&self, path: &Path, last_error: Option<String>) -> OperationResult {
        warn!(path = %path.display(), "permission denied; retrying with elevated rights");
        let output = self.host.remove_elevated(path);
        let removed = gone(path);

        let error = match &output {
            Ok(out) if out.success() => None,
            Ok(out) => Some(out.error_text()),
            Err(e) => Some(e.to_string()),
        };
        self.trace.record(
            Event::new(EventAction::ElevatedRemove)
                .with_path(path)
                .with_details(json!({"ok": removed, "error": error})),
        );

        if removed {
            return OperationResult::success(format!(
                "Deleted {} with elevated rights",
                path.display()
            ));
        }

        let detail = error
            .filter(|e| !e.is_empty())
            .or(last_error)
            .unwrap_or_else(|| "access denied".to_string());
        OperationResult::failure(UnlatchError::PermissionDenied(format!(
            "cannot delete '{}': {}",
            path.display(),
            detail
        )))
    }

    /// Run alternative unlock rounds on a locked file. Returns true if the
    /// file disappeared in the process.
    fn unlock_file(&self, path: &Path) -> bool {
        if !self.host.probe_exclusive(path) {
            return false;
        }

        for round in 1..=self.config.unlock_retry_attempts {
            debug!(path = %path.display(), round, "file locked; alternative unlock");
            self.alternative.try_alternative_unlock(path);
            if gone(path) {
                return true;
            }
            if !self.host.probe_exclusive(path) {
                return false;
            }
            std::thread::sleep(self.config.unlock_retry_delay(round));
        }

        warn!(path = %path.display(), "file still locked; running the cascade anyway");
        false
    }

    /// Remove everything below `dir`, deepest entries first. Individual
    /// failures are logged and skipped. Returns the entry count including
    /// `dir` itself, for progress totals.
    fn empty_directory(&self, dir: &Path, unlock: bool, reporter: &mut Reporter) -> Result<usize> {
        let entries: Vec<_> = WalkDir::new(dir)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .collect();
        let total = entries.len() + 1;

        for (index, entry) in entries.iter().enumerate() {
            reporter.checkpoint()?;

            let path = entry.path();
            let kind = if entry.file_type().is_dir() {
                PathKind::Directory
            } else {
                PathKind::File
            };

            if unlock && kind == PathKind::File && self.host.probe_exclusive(path) {
                self.alternative.try_alternative_unlock(path);
            }
            if !gone(path)
                && let Err(e) = self.host.remove_native(path, kind)
            {
                warn!(path = %path.display(), error = %e, "could not remove entry");
            }

            reporter.report(index + 1, total)?;
        }

        Ok(total)
    }
}
