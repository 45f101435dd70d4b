//! Task state, episode identifiers and published snapshots.

use std::fmt;

use crate::artifact::ArtifactReference;
use crate::progress::{Phase, ProgressValue};

/// Tag identifying one submission episode.
///
/// Ids increase monotonically per controller; a signal carrying any id other
/// than the active one is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of the controller. Exactly one variant is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Idle,
    Running(RequestId),
    Succeeded(ArtifactReference),
    /// Holds the user-facing failure message.
    Failed(String),
}

impl TaskState {
    /// True while `id` is the active episode.
    #[must_use]
    pub fn is_running_episode(&self, id: RequestId) -> bool {
        matches!(self, Self::Running(active) if *active == id)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    /// True for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }

    #[must_use]
    pub fn artifact(&self) -> Option<&ArtifactReference> {
        match self {
            Self::Succeeded(reference) => Some(reference),
            _ => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// What the view layer renders: published on every transition and every
/// accepted progress tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskSnapshot {
    pub state: TaskState,
    pub progress: ProgressValue,
    pub phase: Phase,
}
