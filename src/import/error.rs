//! Error types for the import & archive stage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while bulk-loading or archiving staged exports.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The staging directory could not be listed.
    #[error("failed to list staging directory {path}: {source}")]
    ListStaging {
        /// The staging directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A staged export could not be read as CSV.
    #[error("failed to read export {path}: {source}")]
    Read {
        /// The export file.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// The store rejected the batch.
    #[error("store error: {0}")]
    Database(#[from] sqlx::Error),

    /// A loader refused the batch for a reason of its own.
    #[error("bulk load rejected: {reason}")]
    Rejected {
        /// Human-readable reason.
        reason: String,
    },

    /// Background parsing was cancelled or panicked.
    #[error("export parsing task failed: {0}")]
    Task(String),

    /// A loaded file could not be moved into the archive.
    #[error("failed to archive {from} to {to}: {source}")]
    Archive {
        /// The staged file.
        from: PathBuf,
        /// The intended archive path.
        to: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    /// Creates a rejection error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns true if the failure happened while archiving, after the load succeeded.
    #[must_use]
    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive { .. })
    }
}
