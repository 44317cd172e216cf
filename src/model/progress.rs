//! Progress reporting and cooperative cancellation.
//!
//! Long-running operations call [`Reporter::checkpoint`] at their safe points
//! and [`Reporter::report`] after each unit of work. A consumer callback that
//! returns `false` cancels the operation exactly like [`CancelToken::cancel`].

use crate::error::{Result, UnlatchError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress of a scan or deletion. `total == 0` means indeterminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReport {
    pub current: usize,
    pub total: usize,
}

impl ProgressReport {
    /// Build a report, clamping `current` to `total` once the total is known.
    pub fn new(current: usize, total: usize) -> Self {
        let current = if total > 0 { current.min(total) } else { current };
        Self { current, total }
    }

    pub fn is_indeterminate(&self) -> bool {
        self.total == 0
    }

    /// Completion percentage, or `None` when indeterminate.
    pub fn percent(&self) -> Option<u8> {
        if self.is_indeterminate() {
            None
        } else {
            Some((self.current * 100 / self.total) as u8)
        }
    }
}

/// Consumer callback; returning `false` requests cancellation.
pub type ProgressFn = Box<dyn FnMut(ProgressReport) -> bool + Send>;

/// Shared cancellation flag handed out at call start.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress sink plus cancellation token for one operation.
pub struct Reporter<'a> {
    callback: Option<Box<dyn FnMut(ProgressReport) -> bool + Send + 'a>>,
    cancel: CancelToken,
}

impl<'a> Reporter<'a> {
    /// A reporter with no consumer and a fresh token.
    pub fn silent() -> Self {
        Self {
            callback: None,
            cancel: CancelToken::new(),
        }
    }

    /// A reporter bound to an existing token, without a consumer.
    pub fn with_token(cancel: CancelToken) -> Self {
        Self {
            callback: None,
            cancel,
        }
    }

    /// A reporter forwarding progress to `callback`.
    pub fn new(
        cancel: CancelToken,
        callback: impl FnMut(ProgressReport) -> bool + Send + 'a,
    ) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with `Cancelled` if cancellation has been requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(UnlatchError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Emit a progress report and honour a stop signal from the consumer.
    pub fn report(&mut self, current: usize, total: usize) -> Result<()> {
        if let Some(callback) = self.callback.as_mut()
            && !callback(ProgressReport::new(current, total))
        {
            self.cancel.cancel();
        }
        self.checkpoint()
    }
}

impl Default for Reporter<'_> {
    fn default() -> Self {
        Self::silent()
    }
}
