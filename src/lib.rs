//! Deckgen Core Library
//!
//! Client-side coordination for generating a presentation deck from a remote
//! service: validate the input, show synthetic progress while the service
//! works, settle on exactly one outcome, and hand the result to a save action.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`request`] - Validated generation input
//! - [`progress`] - Synthetic progress simulator and phase labels
//! - [`executor`] - Request execution against the generation service
//! - [`task`] - The task state machine tying simulator and executor together
//! - [`artifact`] - Artifact materialization, download and release

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod executor;
pub mod progress;
pub mod request;
pub mod task;
#[cfg(test)]
pub mod test_support;

// Re-export commonly used types
pub use artifact::{
    ArtifactError, ArtifactManager, ArtifactReference, DirectorySaveTarget, PendingDownload,
    SavePayload, SaveTarget, SavedArtifact, suggested_filename,
};
pub use executor::{
    DEFAULT_ENDPOINT, ErrorDetail, ExecutorError, GenerationOutcome, HttpExecutor,
    RequestExecutor,
};
pub use progress::{Phase, ProgressValue, SimulatorHandle, SimulatorSettings, TickControl};
pub use request::{GenerationRequest, ValidationError};
pub use task::{RequestId, TaskController, TaskSnapshot, TaskState, failure_message};
