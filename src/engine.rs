//! Upward interface of the engine.
//!
//! [`Engine`] bundles configuration, the host seam, the probe gate and the
//! operation trace. Every operation exists in a blocking form taking a
//! [`Reporter`] and a `spawn_*` form that runs on its own worker thread and
//! returns an [`OperationHandle`] for cancellation.

use crate::config::Config;
use crate::critical::CriticalityClassifier;
use crate::delete::DeletionCascade;
use crate::error::{Result, UnlatchError};
use crate::events::Trace;
use crate::host::{Host, NativeHost};
use crate::model::{CancelToken, LockOwner, OperationResult, ProgressFn, Reporter};
use crate::orchestrator::Orchestrator;
use crate::probe::{LockProber, ProbeGate};
use crate::unlock::UnlockCoordinator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Cloneable handle to the engine; clones share the gate and the trace.
#[derive(Clone)]
pub struct Engine {
    config: Arc<Config>,
    host: Arc<dyn Host>,
    gate: Arc<ProbeGate>,
    trace: Trace,
}

/// A running operation on a worker thread.
pub struct OperationHandle<T> {
    cancel: CancelToken,
    thread: JoinHandle<T>,
}

impl<T> OperationHandle<T> {
    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker. A panicking worker is reported as an error.
    pub fn join(self) -> Result<T> {
        self.thread
            .join()
            .map_err(|_| UnlatchError::Unknown("worker thread panicked".to_string()))
    }
}

impl Engine {
    pub fn new(config: Config, host: Arc<dyn Host>) -> Self {
        let trace = Trace::with_sink(config.trace_file.clone());
        Self {
            config: Arc::new(config),
            host,
            gate: Arc::new(ProbeGate::new()),
            trace,
        }
    }

    /// An engine driving the real operating system.
    pub fn native(config: Config) -> Self {
        Self::new(config, Arc::new(NativeHost::new()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Whether `owner` would be left running by the unlock policy.
    pub fn is_critical(&self, owner: &LockOwner) -> bool {
        !owner.is_placeholder()
            && CriticalityClassifier::new(&self.config, self.host.as_ref())
                .is_critical(&owner.process_name, owner.pid)
    }

    pub fn probe(&self, path: &Path, reporter: &mut Reporter) -> Result<Vec<LockOwner>> {
        LockProber::new(&self.config, self.host.as_ref(), &self.gate, &self.trace)
            .probe(path, reporter)
    }

    /// Sample a large directory without the size check of [`Engine::probe`].
    pub fn probe_large_directory(
        &self,
        dir: &Path,
        reporter: &mut Reporter,
    ) -> Result<Vec<LockOwner>> {
        LockProber::new(&self.config, self.host.as_ref(), &self.gate, &self.trace)
            .probe_large_directory(dir, reporter)
    }

    pub fn unlock(
        &self,
        path: &Path,
        owners: &[LockOwner],
        reporter: &mut Reporter,
    ) -> OperationResult {
        UnlockCoordinator::new(&self.config, self.host.as_ref(), &self.trace)
            .unlock_with_progress(path, owners, reporter)
    }

    pub fn delete(&self, path: &Path, reporter: &mut Reporter) -> OperationResult {
        DeletionCascade::new(&self.config, self.host.as_ref(), &self.trace).delete(path, reporter)
    }

    pub fn unlock_and_delete(
        &self,
        path: &Path,
        owners: &[LockOwner],
        reporter: &mut Reporter,
    ) -> OperationResult {
        Orchestrator::new(&self.config, self.host.as_ref(), &self.trace)
            .unlock_and_delete(path, owners, reporter)
    }

    pub fn spawn_probe(
        &self,
        path: PathBuf,
        on_progress: Option<ProgressFn>,
    ) -> OperationHandle<Result<Vec<LockOwner>>> {
        self.spawn(on_progress, move |engine, reporter| engine.probe(&path, reporter))
    }

    pub fn spawn_unlock(
        &self,
        path: PathBuf,
        owners: Vec<LockOwner>,
        on_progress: Option<ProgressFn>,
    ) -> OperationHandle<OperationResult> {
        self.spawn(on_progress, move |engine, reporter| {
            engine.unlock(&path, &owners, reporter)
        })
    }

    pub fn spawn_delete(
        &self,
        path: PathBuf,
        on_progress: Option<ProgressFn>,
    ) -> OperationHandle<OperationResult> {
        self.spawn(on_progress, move |engine, reporter| engine.delete(&path, reporter))
    }

    pub fn spawn_unlock_and_delete(
        &self,
        path: PathBuf,
        owners: Vec<LockOwner>,
        on_progress: Option<ProgressFn>,
    ) -> OperationHandle<OperationResult> {
        self.spawn(on_progress, move |engine, reporter| {
            engine.unlock_and_delete(&path, &owners, reporter)
        })
    }

    fn spawn<T, F>(&self, on_progress: Option<ProgressFn>, work: F) -> OperationHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(Engine, &mut Reporter<'_>) -> T + Send + 'static,
    {
        let cancel = CancelToken::new();
        let worker_token = cancel.clone();
        let engine = self.clone();

        let thread = std::thread::spawn(move || {
            let mut reporter = match on_progress {
                Some(callback) => Reporter::new(worker_token, callback),
                None => Reporter::with_token(worker_token),
            };
            work(engine, &mut reporter)
        });

        OperationHandle { cancel, thread }
    }
}
