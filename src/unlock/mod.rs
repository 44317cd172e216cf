//! Unlock Coordinator.
//!
//! Walks a list of lock owners in order and releases each one:
//!
//! - placeholder owners (pid 0) go straight to the alternative strategies
//!   and never count as failures
//! - owners that already exited count as handled
//! - critical owners are left running, but their file still gets the
//!   alternative strategies
//! - everything else is terminated; a failed termination falls back to the
//!   alternative strategies before the owner is given up on
//!
//! Work already done is never rolled back, including on cancellation.

mod alternative;


pub use alternative::AlternativeUnlocker;

use crate::config::Config;
use crate::critical::CriticalityClassifier;
use crate::error::UnlatchError;
use crate::events::{Event, EventAction, Trace};
use crate::host::{Host, PathKind};
use crate::model::{LockOwner, OperationResult, Reporter};
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

/// How one owner was dealt with.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OwnerOutcome {
    Terminated,
    AlreadyExited,
    Placeholder,
    SkippedCritical,
    Recovered,
    Failed(String),
}

/// Per-owner outcomes folded into the composite result message.
#[derive(Debug, Default)]
struct Tally {
    handled: Vec<String>,
    skipped: Vec<String>,
    failed: Vec<String>,
}

impl Tally {
    fn record(&mut self, owner: &LockOwner, outcome: OwnerOutcome) {
        match outcome {
            OwnerOutcome::Terminated | OwnerOutcome::AlreadyExited | OwnerOutcome::Placeholder => {
                self.handled.push(owner.label())
            }
            OwnerOutcome::Recovered => {
                self.handled
                    .push(format!("{} [alternative method]", owner.label()))
            }
            OwnerOutcome::SkippedCritical => self.skipped.push(owner.label()),
            OwnerOutcome::Failed(reason) => {
                self.failed.push(format!("{}: {}", owner.label(), reason))
            }
        }
    }

    fn into_result(self) -> OperationResult {
        let skipped_note = (!self.skipped.is_empty())
            .then(|| UnlatchError::CriticalProcessSkipped(self.skipped.join(", ")).to_string());

        if !self.failed.is_empty() {
            let mut message = format!("could not terminate {}", self.failed.join("; "));
            if !self.handled.is_empty() {
                message.push_str(&format!("; succeeded: {}", self.handled.join(", ")));
            }
            if let Some(note) = skipped_note {
                message.push_str(&format!("; {}", note));
            }
            return OperationResult::failure(UnlatchError::ProcessTerminationFailed(message));
        }

        let mut message = format!("Successfully handled {} process(es)", self.handled.len());
        if let Some(note) = skipped_note {
            message.push_str(&format!(" ({})", note));
        }
        OperationResult::success(message)
    }
}

/// Releases lock owners by termination or alternative strategies.
pub struct UnlockCoordinator<'a> {
    host: &'a dyn Host,
    trace: &'a Trace,
    classifier: CriticalityClassifier<'a>,
    alternative: AlternativeUnlocker<'a>,
}

impl<'a> UnlockCoordinator<'a> {
    pub fn new(config: &'a Config, host: &'a dyn Host, trace: &'a Trace) -> Self {
        Self {
            host,
            trace,
            classifier: CriticalityClassifier::new(config, host),
            alternative: AlternativeUnlocker::new(config, host, trace),
        }
    }

    /// Release every owner of `path`.
    pub fn unlock(&self, path: &Path, owners: &[LockOwner]) -> OperationResult {
        self.unlock_with_progress(path, owners, &mut Reporter::silent())
    }

    /// Release owners one at a time, reporting after each and stopping
    /// before the next owner once cancellation is requested.
    pub fn unlock_with_progress(
        &self,
        path: &Path,
        owners: &[LockOwner],
        reporter: &mut Reporter,
    ) -> OperationResult {
        if owners.is_empty() {
            return OperationResult::success("nothing to unlock");
        }

        info!(path = %path.display(), owners = owners.len(), "unlocking");
        let mut tally = Tally::default();
        for (index, owner) in owners.iter().enumerate() {
            if let Err(e) = reporter.checkpoint() {
                info!(done = index, "unlock cancelled");
                return e.into();
            }

            let outcome = self.unlock_owner(path, owner);
            tally.record(owner, outcome);

            // A stop request here is honoured at the next checkpoint.
            let _ = reporter.report(index + 1, owners.len());
        }

        tally.into_result().cancelled_if(reporter.is_cancelled())
    }

    fn unlock_owner(&self, path: &Path, owner: &LockOwner) -> OwnerOutcome {
        let target = unlock_target(path, owner);

        if owner.is_placeholder() {
            let released = self.alternative.try_alternative_unlock(target);
            info!(path = %target.display(), released, "placeholder owner handled by alternative unlock");
            return OwnerOutcome::Placeholder;
        }

        match self.host.is_process_running(owner.pid) {
            Ok(false) => {
                info!(owner = %owner.label(), "process already exited");
                return OwnerOutcome::AlreadyExited;
            }
            Ok(true) => {}
            Err(e) => {
                warn!(owner = %owner.label(), error = %e, "liveness query failed; assuming running");
            }
        }

        if self.classifier.is_critical(&owner.process_name, owner.pid) {
            warn!(owner = %owner.label(), "skipping critical process");
            self.trace.record(
                Event::new(EventAction::CriticalSkip)
                    .with_path(target)
                    .with_details(json!({"pid": owner.pid, "process": owner.process_name})),
            );
            self.alternative.try_alternative_unlock(target);
            return OwnerOutcome::SkippedCritical;
        }

        let error = match self.host.terminate(owner.pid) {
            Ok(output) if output.success() => None,
            Ok(output) => Some(match output.error_text() {
                text if text.is_empty() => format!("exit code {:?}", output.code),
                text => text,
            }),
            Err(e) => Some(e.to_string()),
        };
        self.trace.record(
            Event::new(EventAction::Terminate)
                .with_path(target)
                .with_details(json!({
                    "pid": owner.pid,
                    "process": owner.process_name,
                    "ok": error.is_none(),
                    "error": error,
                })),
        );

        let Some(reason) = error else {
            info!(owner = %owner.label(), "terminated");
            return OwnerOutcome::Terminated;
        };

        warn!(owner = %owner.label(), error = %reason, "termination failed; trying alternative unlock");
        if self.alternative.try_alternative_unlock(target) {
            OwnerOutcome::Recovered
        } else {
            OwnerOutcome::Failed(reason)
        }
    }
}

/// The owner's file, or the queried path when the owner names no file.
fn unlock_target<'p>(path: &'p Path, owner: &'p LockOwner) -> &'p Path {
    if PathKind::of(&owner.file_path) == Some(PathKind::File) {
        &owner.file_path
    } else {
        path
    }
}
