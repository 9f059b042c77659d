//! Identifiers and lifecycle states of pipeline runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of one pipeline run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// What a run writes to: a project, optionally narrowed to one chapter.
///
/// Two live runs must never share a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunTarget {
    /// Project identifier
    pub project_id: String,
    /// Chapter identifier for chapter-scoped runs
    pub chapter_id: Option<String>,
}

impl RunTarget {
    /// Creates a target.
    pub fn new(project_id: impl Into<String>, chapter_id: Option<String>) -> Self {
        Self {
            project_id: project_id.into(),
            chapter_id,
        }
    }
}

impl fmt::Display for RunTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chapter_id {
            Some(chapter) => write!(f, "project '{}' chapter '{}'", self.project_id, chapter),
            None => write!(f, "project '{}'", self.project_id),
        }
    }
}

/// Lifecycle state of a pipeline run.
///
/// `Idle` is the only initial state; `Completed`, `Cancelled` and `Error`
/// are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    /// Created, not yet started
    Idle,
    /// Executing steps
    Running,
    /// Parked until resumed or cancelled
    Paused,
    /// All steps finished
    Completed,
    /// Stopped by a cancel request
    Cancelled,
    /// Stopped by an agent failure
    Error,
}

impl RunState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Cancelled | RunState::Error)
    }

    /// Whether the run is occupying its target.
    pub fn is_live(&self) -> bool {
        matches!(self, RunState::Running | RunState::Paused)
    }
}
