//! Constants for the request executor (endpoint, timeouts, content types).

/// Generation endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/generate-ppt/";

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default whole-request timeout (5 minutes; generation is slow).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Content type of a generated `.pptx` document.
pub const PRESENTATION_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Content types accepted as a raw artifact body.
pub(crate) const BINARY_CONTENT_TYPES: &[&str] = &[
    PRESENTATION_CONTENT_TYPE,
    "application/vnd.ms-powerpoint",
    "application/octet-stream",
];

/// Message used when a JSON success body carries no locator.
pub(crate) const MISSING_LOCATOR_REASON: &str =
    "Server did not provide a download link despite success status.";
