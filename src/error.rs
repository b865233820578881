//! Errors returned by the UltraOCR client.
//!
//! Nothing in this crate retries a failed request. Each error is handed back
//! to the immediate caller, and the only repetition anywhere is the polling
//! loop in [`crate::client::wait`], which repeats *status checks*.

use std::{path::PathBuf, time::Duration};

use reqwest::StatusCode;
use thiserror::Error;

/// A [`Result`] using our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Something went wrong while talking to UltraOCR.
///
/// Note that a job or batch which finishes with status `error` is _not_
/// reported here. That is a normal terminal value, and callers need to check
/// [`crate::Status::is_error`] themselves.
#[derive(Debug, Error)]
pub enum Error {
    /// We could not build the request (bad URL, unserializable body, invalid
    /// Base64 input, etc).
    #[error("failed to mount request: {0}")]
    Mount(String),

    /// The transport failed before we got a response.
    #[error("failed to send request to {url}")]
    Transport {
        /// The URL we were trying to reach.
        url: String,
        /// The underlying transport error.
        #[source]
        source: anyhow::Error,
    },

    /// The server answered with an unexpected status code.
    #[error("invalid status code {status} from {url}: {body}")]
    Status {
        /// The URL we called.
        url: String,
        /// The status we received.
        status: StatusCode,
        /// The response body, decoded lossily.
        body: String,
    },

    /// The response body was not what we expected.
    #[error("failed to parse response body from {url}")]
    Parse {
        /// The URL we called.
        url: String,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A local file could not be read.
    #[error("failed to read file {path:?}")]
    FileRead {
        /// The file we tried to read.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// We polled until the deadline without seeing a terminal status.
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout {
        /// What we were waiting for, for example `job 2AwrSd...`.
        what: String,
        /// The configured poll timeout.
        timeout: Duration,
    },

    /// Authentication was rejected, or the token endpoint misbehaved.
    #[error("authentication failed")]
    Auth(#[source] Box<Error>),

    /// The signed-URL response did not include a slot we needed.
    #[error("signed URL response has no {0:?} upload slot")]
    MissingUploadSlot(String),

    /// Invalid local configuration, caught before any request is sent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// The HTTP status, if this error was caused by a bad status code (either
    /// directly, or while authenticating).
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Auth(inner) => inner.status(),
            _ => None,
        }
    }

    /// Is this a polling timeout?
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
