//! Artifact lifecycle: turning a generation outcome into something that can
//! be downloaded, and releasing it once it is superseded.
//!
//! # Overview
//!
//! - [`ArtifactManager::materialize`] converts a [`GenerationOutcome`] into an
//!   [`ArtifactReference`]. Remote locators are passed through; binary bodies
//!   are kept in memory behind a [`LocalHandle`].
//! - [`ArtifactManager::release`] frees a local payload. Releasing twice, or
//!   releasing a remote reference, is a no-op.
//! - [`ArtifactManager::prepare_download`] pairs the payload with its
//!   suggested name; [`PendingDownload::trigger`] then hands it to a
//!   [`SaveTarget`] without borrowing the manager.
//!
//! # Example
//!
//! ```
//! use deckgen_core::artifact::{ArtifactManager, ArtifactReference};
//! use deckgen_core::executor::GenerationOutcome;
//!
//! let mut manager = ArtifactManager::new();
//! let reference = manager.materialize(GenerationOutcome::Remote {
//!     locator: "/download/deck.pptx".to_string(),
//! });
//! assert_eq!(reference.locator(), Some("/download/deck.pptx"));
//! assert!(!manager.release(&reference));
//! ```

mod error;
pub mod filename;
mod save;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::executor::GenerationOutcome;

pub use error::ArtifactError;
pub use filename::suggested_filename;
pub use save::{DirectorySaveTarget, SavePayload, SaveTarget, SavedArtifact};

/// Handle to a payload held by an [`ArtifactManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHandle {
    id: u64,
    len: usize,
    content_type: Option<String>,
    filename_hint: Option<String>,
}

impl LocalHandle {
    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; empty payloads are never materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Content type reported by the service.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// Something the user can download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactReference {
    /// Server-side file; the locator is the download address.
    Remote {
        /// Absolute or endpoint-relative locator.
        locator: String,
    },
    /// File held in memory until released.
    Local(LocalHandle),
}

impl ArtifactReference {
    /// The remote locator, if this is a remote reference.
    #[must_use]
    pub fn locator(&self) -> Option<&str> {
        match self {
            Self::Remote { locator } => Some(locator),
            Self::Local(_) => None,
        }
    }

    /// True for references backed by held bytes.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Name suggested by the artifact itself.
    ///
    /// For remote references this is the locator's last path segment; for
    /// local ones the `Content-Disposition` filename, when one was sent.
    #[must_use]
    pub fn filename_hint(&self) -> Option<String> {
        match self {
            Self::Remote { locator } => filename::filename_from_locator(locator),
            Self::Local(handle) => handle.filename_hint.clone(),
        }
    }
}

/// Owns in-memory artifact payloads.
#[derive(Debug, Default)]
pub struct ArtifactManager {
    store: HashMap<u64, Arc<[u8]>>,
    next_id: u64,
}

impl ArtifactManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts an outcome into a downloadable reference.
    pub fn materialize(&mut self, outcome: GenerationOutcome) -> ArtifactReference {
        match outcome {
            GenerationOutcome::Remote { locator } => {
                debug!(%locator, "remote artifact");
                ArtifactReference::Remote { locator }
            }
            GenerationOutcome::Binary {
                bytes,
                content_type,
                filename,
            } => {
                self.next_id += 1;
                let id = self.next_id;
                let len = bytes.len();
                self.store.insert(id, Arc::from(bytes));
                debug!(id, len, "holding local artifact");
                ArtifactReference::Local(LocalHandle {
                    id,
                    len,
                    content_type,
                    filename_hint: filename,
                })
            }
        }
    }

    /// Frees the payload behind `reference`.
    ///
    /// Returns true when something was actually released.
    pub fn release(&mut self, reference: &ArtifactReference) -> bool {
        match reference {
            ArtifactReference::Remote { .. } => false,
            ArtifactReference::Local(handle) => {
                let released = self.store.remove(&handle.id).is_some();
                if released {
                    debug!(id = handle.id, "released local artifact");
                }
                released
            }
        }
    }

    /// The payload a save target should receive, if still available.
    #[must_use]
    pub fn payload(&self, reference: &ArtifactReference) -> Option<SavePayload> {
        match reference {
            ArtifactReference::Remote { locator } => Some(SavePayload::Remote(locator.clone())),
            ArtifactReference::Local(handle) => {
                self.store.get(&handle.id).cloned().map(SavePayload::Local)
            }
        }
    }

    /// Number of local payloads currently held.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.store.len()
    }

    /// Pairs the payload behind `reference` with `suggested_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Released`] if the payload was released.
    pub fn prepare_download(
        &self,
        reference: &ArtifactReference,
        suggested_name: impl Into<String>,
    ) -> Result<PendingDownload, ArtifactError> {
        let payload = self.payload(reference).ok_or(ArtifactError::Released)?;
        Ok(PendingDownload {
            payload,
            filename: suggested_name.into(),
        })
    }
}

/// A payload ready to be saved, detached from its [`ArtifactManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDownload {
    payload: SavePayload,
    filename: String,
}

impl PendingDownload {
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Hands the payload to `target`.
    ///
    /// # Errors
    ///
    /// Returns whatever the save target reports.
    #[instrument(skip(self, target), fields(filename = %self.filename))]
    pub async fn trigger(self, target: &dyn SaveTarget) -> Result<SavedArtifact, ArtifactError> {
        let saved = target.save(self.payload, &self.filename).await?;
        info!(path = %saved.path.display(), "download complete");
        Ok(saved)
    }
}
