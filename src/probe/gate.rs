//! Exclusive gate serializing probe invocations.

use std::sync::{Mutex, MutexGuard};

/// At most one probe runs at a time per gate.
///
/// The engine owns one gate and shares it between worker threads; tests
/// create their own.
#[derive(Debug, Default)]
pub struct ProbeGate {
    lock: Mutex<()>,
}

impl ProbeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the gate is free. A panic in a previous holder does not
    /// poison the gate.
    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}
