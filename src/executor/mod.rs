//! Request execution against the remote generation service.
//!
//! [`RequestExecutor`] is the seam between the task controller and the
//! network: the controller only sees a [`GenerationOutcome`] or a typed
//! [`ExecutorError`]. [`HttpExecutor`] is the reqwest-backed implementation.
//!
//! # Response shapes
//!
//! - JSON `{"download_url": "..."}` becomes [`GenerationOutcome::Remote`].
//! - A presentation (or octet-stream) body becomes
//!   [`GenerationOutcome::Binary`]; an empty body is [`ExecutorError::EmptyResult`].
//! - Non-success statuses become [`ExecutorError::Server`] with whatever
//!   structured detail the error body carried.

mod constants;
mod error;
mod http;

use async_trait::async_trait;

use crate::request::GenerationRequest;

pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_ENDPOINT, PRESENTATION_CONTENT_TYPE, REQUEST_TIMEOUT_SECS,
};
pub use error::{ErrorDetail, ExecutorError};
pub use http::HttpExecutor;

/// Successful result of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The service stored the file and returned where to fetch it.
    Remote {
        /// Locator as returned by the service; may be relative to the endpoint.
        locator: String,
    },
    /// The response body is the file itself.
    Binary {
        bytes: Vec<u8>,
        content_type: Option<String>,
        /// Filename suggested by a `Content-Disposition` header.
        filename: Option<String>,
    },
}

/// Performs one generation request.
///
/// Implementations must not retry; recovery is always a new submission.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Sends `request` and classifies the response.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutorError`] for transport failures, non-success
    /// statuses, empty binary bodies and unparseable success bodies.
    async fn execute(&self, request: &GenerationRequest)
    -> Result<GenerationOutcome, ExecutorError>;
}
