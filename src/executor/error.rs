//! Error types for the request executor.
//!
//! Every variant carries the context a user-facing message needs; the task
//! controller turns them into text (see [`crate::task::failure_message`]).

use thiserror::Error;

/// Structured detail read from a non-success response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    /// First per-field validation message (`{"detail": [{"msg": ...}]}`).
    Field(String),
    /// Generic error string (`{"detail": "..."}` or `{"message": "..."}`).
    Message(String),
}

/// Failures of a single generation request.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The request never produced a response (DNS, refused connection, TLS,
    /// timeout, interrupted body).
    #[error("network error contacting {endpoint}: {source}")]
    Network {
        /// The endpoint that could not be reached.
        endpoint: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("HTTP {status} from generation service")]
    Server {
        /// The HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status, when one exists.
        status_text: Option<String>,
        /// Structured detail from the error body, when it parsed.
        detail: Option<ErrorDetail>,
    },

    /// The service reported success but the generated file has no content.
    #[error("generated file is empty")]
    EmptyResult,

    /// The success body could not be understood.
    #[error("unexpected response from generation service: {reason}")]
    Parse {
        /// What was wrong with the body.
        reason: String,
    },

    /// The configured endpoint is not a valid absolute URL.
    #[error("invalid generation endpoint: {endpoint}")]
    InvalidEndpoint {
        /// The rejected endpoint string.
        endpoint: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

impl ExecutorError {
    /// Creates a network error.
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates a server error from a status code and optional body detail.
    ///
    /// The reason phrase is looked up from the status code.
    #[must_use]
    pub fn server(status: u16, detail: Option<ErrorDetail>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .map(str::to_string);
        Self::Server {
            status,
            status_text,
            detail,
        }
    }

    /// Creates a parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(endpoint: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
        }
    }

    /// Returns true when the failure happened before any response arrived.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// HTTP status of a server error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
