//! Operation trace for unlatch.
//!
//! Every externally visible step the engine takes (tool runs, terminations,
//! alternative-unlock strategies, deletion methods, orchestrator state
//! changes) is recorded as an [`Event`]. The trace is kept in memory for the
//! caller and, when a sink file is configured, appended as NDJSON (one JSON
//! object per line).
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: The step performed (tool_run, terminate, delete_method, ...)
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `path`: Optional path the step applied to
//! - `details`: Freeform object with step-specific details

use crate::error::{Result, UnlatchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Steps that can be recorded in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Handle-enumeration tool invocation
    ToolRun,
    /// Forced termination of a lock owner
    Terminate,
    /// Lock owner left running because it is critical
    CriticalSkip,
    /// One alternative-unlock strategy attempt
    AlternativeUnlock,
    /// One deletion method of the cascade (all of its tries)
    DeleteMethod,
    /// Elevated-rights removal after a permission error
    ElevatedRemove,
    /// Unlock-and-delete state transition
    StateChange,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::ToolRun => write!(f, "tool_run"),
            EventAction::Terminate => write!(f, "terminate"),
            EventAction::CriticalSkip => write!(f, "critical_skip"),
            EventAction::AlternativeUnlock => write!(f, "alternative_unlock"),
            EventAction::DeleteMethod => write!(f, "delete_method"),
            EventAction::ElevatedRemove => write!(f, "elevated_remove"),
            EventAction::StateChange => write!(f, "state_change"),
        }
    }
}

/// An event record for the operation trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The step that was performed.
    pub action: EventAction,

    /// The actor who performed the step (e.g., `user@HOST`).
    pub actor: String,

    /// Path the step applied to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Freeform details object with step-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            path: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the path for this event.
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            UnlatchError::Unknown(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Shared, append-only trace of one engine.
///
/// Clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: Arc<Mutex<Vec<Event>>>,
    sink: Option<PathBuf>,
}

impl Trace {
    /// An in-memory trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// A trace that also appends every event to `sink`.
    pub fn with_sink(sink: Option<PathBuf>) -> Self {
        Self {
            events: Arc::default(),
            sink,
        }
    }

    /// Record an event. Sink failures are logged and never abort the caller.
    pub fn record(&self, event: Event) {
        if let Some(sink) = &self.sink
            && let Err(e) = append_event(sink, &event)
        {
            warn!(error = %e, "failed to append trace event");
        }

        self.lock().push(event);
    }

    /// Snapshot of every recorded event.
    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    /// Number of recorded events with the given action.
    pub fn count(&self, action: EventAction) -> usize {
        self.lock().iter().filter(|e| e.action == action).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Append an event to an NDJSON file.
///
/// The file and its parent directory are created if they don't exist. Each
/// append results in one line with a trailing newline.
pub fn append_event(events_file: &Path, event: &Event) -> Result<()> {
    let json_line = event.to_ndjson_line()?;

    if let Some(parent) = events_file.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            UnlatchError::UserError(format!(
                "failed to create trace directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(events_file)
        .map_err(|e| {
            UnlatchError::UserError(format!(
                "failed to open trace file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        UnlatchError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}
