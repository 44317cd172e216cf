//! Declarative method list and the driver loop that walks it.

use crate::config::Config;
use crate::events::{Event, EventAction, Trace};
use crate::host::{CommandOutput, PathKind};
use serde_json::json;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Result of one try of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Attempt {
    Completed,
    Failed(String),
    Denied(String),
}

impl Attempt {
    pub(crate) fn from_io(result: io::Result<()>) -> Self {
        match result {
            Ok(()) => Attempt::Completed,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Attempt::Denied(e.to_string()),
            Err(e) => Attempt::classify(e.to_string()),
        }
    }

    pub(crate) fn from_command(result: io::Result<CommandOutput>) -> Self {
        match result {
            Ok(output) if output.success() => Attempt::Completed,
            Ok(output) => Attempt::classify(output.error_text()),
            Err(e) => Attempt::from_io(Err(e)),
        }
    }

    /// Scripts report denial only in their error text.
    fn classify(message: String) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("access is denied")
            || lower.contains("permission denied")
            || lower.contains("unauthorizedaccess")
        {
            Attempt::Denied(message)
        } else {
            Attempt::Failed(message)
        }
    }
}

/// A named deletion primitive.
pub(crate) struct Method<'m> {
    pub name: &'static str,
    run: Box<dyn Fn(&Path, PathKind) -> Attempt + 'm>,
}

impl<'m> Method<'m> {
    pub(crate) fn new(
        name: &'static str,
        run: impl Fn(&Path, PathKind) -> Attempt + 'm,
    ) -> Self {
        Self {
            name,
            run: Box::new(run),
        }
    }
}

/// How a pass over the method list ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CascadeOutcome {
    Removed { method: &'static str },
    Exhausted {
        permission_denied: bool,
        last_error: Option<String>,
    },
}

pub(crate) fn gone(path: &Path) -> bool {
    PathKind::of(path).is_none()
}

/// Try each method in order until the path no longer exists.
///
/// Every method gets `method_attempts` tries with linear backoff. A
/// permission error ends that method's tries at once. One trace event is
/// recorded per method.
pub(crate) fn run_methods(
    config: &Config,
    trace: &Trace,
    path: &Path,
    kind: PathKind,
    methods: &[Method<'_>],
) -> CascadeOutcome {
    let mut permission_denied = false;
    let mut last_error = None;

    for method in methods {
        let mut tries = 0;
        let mut error = None;
        let mut removed = false;

        for attempt in 1..=config.method_attempts {
            tries = attempt;
            let outcome = (method.run)(path, kind);
            if gone(path) {
                removed = true;
                break;
            }

            match outcome {
                Attempt::Denied(message) => {
                    permission_denied = true;
                    error = Some(message);
                    break;
                }
                Attempt::Failed(message) => error = Some(message),
                Attempt::Completed => error = Some("path still exists".to_string()),
            }

            if attempt < config.method_attempts {
                std::thread::sleep(config.method_backoff(attempt));
            }
        }

        trace.record(
            Event::new(EventAction::DeleteMethod)
                .with_path(path)
                .with_details(json!({
                    "method": method.name,
                    "tries": tries,
                    "ok": removed,
                    "error": error,
                })),
        );

        if removed {
            info!(path = %path.display(), method = method.name, tries, "deleted");
            return CascadeOutcome::Removed {
                method: method.name,
            };
        }

        debug!(path = %path.display(), method = method.name, tries, error = ?error, "deletion method failed");
        if error.is_some() {
            last_error = error;
        }
    }

    CascadeOutcome::Exhausted {
        permission_denied,
        last_error,
    }
}
