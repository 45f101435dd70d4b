//! Error types for artifact handling and saving.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while handing an artifact to a save target.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The reference points at a payload that was already released.
    #[error("artifact is no longer available")]
    Released,

    /// There is no successful generation to download.
    #[error("no artifact is available for download")]
    NotAvailable,

    /// File system error while writing the artifact.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Network error while fetching a remote artifact.
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The file server answered with a non-success status.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The locator could not be resolved to a URL.
    #[error("invalid download locator: {locator}")]
    InvalidLocator {
        /// The rejected locator.
        locator: String,
    },
}

impl ArtifactError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a network error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid locator error.
    pub fn invalid_locator(locator: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.into(),
        }
    }
}
