//! Unlock-and-Delete Orchestrator.
//!
//! ```text
//! START -> UNLOCKING -> WAITING_FOR_RELEASE -> DELETING -> SUCCESS | FAILURE
//!                                                        \-> CANCELLED (any state)
//! ```
//!
//! A failed unlock is logged and deletion is attempted anyway. Cancellation
//! is honoured up to the start of `DELETING`; after that the cascade runs to
//! completion, and a cancellation seen along the way only turns a failure
//! into `Cancelled`.

use crate::config::Config;
use crate::delete::DeletionCascade;
use crate::error::UnlatchError;
use crate::events::{Event, EventAction, Trace};
use crate::host::{Host, PathKind};
use crate::model::{LockOwner, OperationResult, Reporter};
use crate::probe::collect_files;
use crate::unlock::{AlternativeUnlocker, UnlockCoordinator};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Orchestrator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Unlocking,
    WaitingForRelease,
    Deleting,
    Success,
    Failure,
    Cancelled,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Start => "START",
            State::Unlocking => "UNLOCKING",
            State::WaitingForRelease => "WAITING_FOR_RELEASE",
            State::Deleting => "DELETING",
            State::Success => "SUCCESS",
            State::Failure => "FAILURE",
            State::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// Composes unlock, wait-for-release and deletion.
pub struct Orchestrator<'a> {
    config: &'a Config,
    host: &'a dyn Host,
    trace: &'a Trace,
    coordinator: UnlockCoordinator<'a>,
    alternative: AlternativeUnlocker<'a>,
    cascade: DeletionCascade<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, host: &'a dyn Host, trace: &'a Trace) -> Self {
        Self {
            config,
            host,
            trace,
            coordinator: UnlockCoordinator::new(config, host, trace),
            alternative: AlternativeUnlocker::new(config, host, trace),
            cascade: DeletionCascade::new(config, host, trace),
        }
    }

    /// Release `owners`, wait for the OS to let go of `path`, then delete it.
    pub fn unlock_and_delete(
        &self,
        path: &Path,
        owners: &[LockOwner],
        reporter: &mut Reporter,
    ) -> OperationResult {
        let mut state = State::Start;

        let Some(kind) = PathKind::of(path) else {
            self.enter(path, &mut state, State::Failure);
            return OperationResult::failure(UnlatchError::PathNotFound(path.to_path_buf()));
        };
        if reporter.checkpoint().is_err() {
            self.enter(path, &mut state, State::Cancelled);
            return OperationResult::Cancelled;
        }

        self.enter(path, &mut state, State::Unlocking);
        match self.coordinator.unlock_with_progress(path, owners, reporter) {
            OperationResult::Cancelled => {
                self.enter(path, &mut state, State::Cancelled);
                return OperationResult::Cancelled;
            }
            OperationResult::Failure { reason } => {
                warn!(path = %path.display(), error = %reason, "unlock failed; deleting anyway");
            }
            OperationResult::Success { message } => {
                info!(path = %path.display(), %message, "unlock finished");
            }
        }

        self.enter(path, &mut state, State::WaitingForRelease);
        if let Err(e) = self.wait_for_release(path, kind, reporter) {
            self.enter(path, &mut state, State::Cancelled);
            return e.into();
        }
        if PathKind::of(path).is_none() {
            self.enter(path, &mut state, State::Success);
            return OperationResult::success(format!(
                "{} was removed while being released",
                path.display()
            ));
        }
        if reporter.checkpoint().is_err() {
            self.enter(path, &mut state, State::Cancelled);
            return OperationResult::Cancelled;
        }

        self.enter(path, &mut state, State::Deleting);
        let result = self
            .cascade
            .delete_released(path)
            .cancelled_if(reporter.is_cancelled());

        let end = match &result {
            OperationResult::Success { .. } => State::Success,
            OperationResult::Failure { .. } => State::Failure,
            OperationResult::Cancelled => State::Cancelled,
        };
        self.enter(path, &mut state, end);
        result
    }

    /// Poll until nothing under `path` is locked, nudging the first locked
    /// file with the alternative strategies on every round.
    fn wait_for_release(
        &self,
        path: &Path,
        kind: PathKind,
        reporter: &Reporter,
    ) -> crate::error::Result<()> {
        let iterations = self.config.release_iterations();
        for iteration in 1..=iterations {
            reporter.checkpoint()?;

            if PathKind::of(path).is_none() {
                return Ok(());
            }
            let Some(locked) = self.first_locked(path, kind) else {
                debug!(path = %path.display(), iteration, "released");
                return Ok(());
            };

            debug!(path = %locked.display(), iteration, "still locked");
            self.alternative.try_alternative_unlock(&locked);
            std::thread::sleep(self.config.release_poll());
        }

        warn!(path = %path.display(), "still locked after waiting; deleting anyway");
        Ok(())
    }

    fn first_locked(&self, path: &Path, kind: PathKind) -> Option<PathBuf> {
        match kind {
            PathKind::File => self
                .host
                .probe_exclusive(path)
                .then(|| path.to_path_buf()),
            PathKind::Directory => collect_files(path)
                .into_iter()
                .find(|file| self.host.probe_exclusive(file)),
        }
    }

    fn enter(&self, path: &Path, state: &mut State, next: State) {
        info!(path = %path.display(), from = %state, to = %next, "state change");
        self.trace.record(
            Event::new(EventAction::StateChange)
                .with_path(path)
                .with_details(json!({"from": state.to_string(), "to": next.to_string()})),
        );
        *state = next;
    }
}
