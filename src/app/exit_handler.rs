//! Exit code logic for the deckgen process.
//!
//! Single responsibility: map the final task state to the process exit outcome.

use deckgen_core::task::TaskState;

use crate::ProcessExit;

/// Determines the process exit outcome from the final state and whether the
/// artifact was saved.
pub(crate) fn determine_exit_outcome(state: &TaskState, saved: bool) -> ProcessExit {
    match state {
        TaskState::Succeeded(_) if saved => ProcessExit::Success,
        _ => ProcessExit::Failure,
    }
}
