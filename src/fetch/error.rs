//! Error types for the fetch module.

use thiserror::Error;

/// Errors raised by a [`FetchSession`](super::FetchSession).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The catalog origin cannot be used as a `Referer` header.
    #[error("catalog origin cannot be sent as a header: {origin}")]
    InvalidOrigin {
        /// The offending origin.
        origin: String,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The request deadline expired before the response completed.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Download response other than HTTP 200.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Every download attempt failed.
    #[error("download of {url} failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        /// The export URL.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Creates a network error, promoting reqwest timeouts to [`FetchError::Timeout`].
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a retries-exhausted error wrapping the last attempt's failure.
    pub fn retries_exhausted(url: impl Into<String>, attempts: u32, last: FetchError) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            attempts,
            last: Box::new(last),
        }
    }

    /// Returns true if the request deadline expired.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
