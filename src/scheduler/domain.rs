//! Task records owned by the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique task name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    /// Creates a task name from a non-empty string, taken exactly as given.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTaskName`] when the name is empty or carries leading
    /// or trailing whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidTaskName> {
        let raw = value.into();
        if raw.is_empty() || raw.trim().len() != raw.len() {
            return Err(InvalidTaskName);
        }
        Ok(Self(raw))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned for an empty or whitespace-padded task name.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("task name must be non-empty without surrounding whitespace")]
pub struct InvalidTaskName;

/// Lifecycle of a task.
///
/// `Pending` moves to `Running` when the timer elapses and then to `Fired`
/// once the callback returns. `Pending` may instead move to `Cancelled`.
/// `Fired` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for its fire time.
    Pending,
    /// Callback in progress.
    Running,
    /// Callback completed.
    Fired,
    /// Cancelled before firing.
    Cancelled,
}

impl TaskState {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Fired => "fired",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` once the callback has completed.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Fired)
    }
}

/// Existence and completion of a named task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// The name was registered.
    pub exists: bool,
    /// The task's callback has completed.
    pub complete: bool,
}

impl TaskStatus {
    /// Status reported for a name that was never registered.
    pub const UNKNOWN: Self = Self {
        exists: false,
        complete: false,
    };
}

/// Point-in-time view of a registered task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    name: TaskName,
    fire_time: DateTime<Utc>,
    payload: serde_json::Value,
    state: TaskState,
}

impl TaskSnapshot {
    pub(crate) const fn new(
        name: TaskName,
        fire_time: DateTime<Utc>,
        payload: serde_json::Value,
        state: TaskState,
    ) -> Self {
        Self {
            name,
            fire_time,
            payload,
            state,
        }
    }

    /// Returns the task name.
    #[must_use]
    pub const fn name(&self) -> &TaskName {
        &self.name
    }

    /// Returns when the task fires.
    #[must_use]
    pub const fn fire_time(&self) -> DateTime<Utc> {
        self.fire_time
    }

    /// Returns the data handed to the callback.
    #[must_use]
    pub const fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns `true` once the callback has completed.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.state.is_complete()
    }
}
