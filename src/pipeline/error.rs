//! Terminal failures of a pipeline run and their HTTP codes.

use thiserror::Error;

use crate::detect::Classification;
use crate::extract::ExtractError;
use crate::fetch::FetchError;
use crate::import::ImportError;
use crate::staging::StageError;

/// Every way a pipeline run can end other than success.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or blank `query` parameter.
    #[error("missing query parameter 'query'")]
    BadInput,

    /// The catalog page answered with a status other than 200.
    #[error("catalog page returned HTTP {status}")]
    UpstreamStatus {
        /// The status the catalog returned.
        status: u16,
    },

    /// The catalog page could not be fetched.
    #[error("catalog request failed: {0}")]
    UpstreamUnavailable(#[source] FetchError),

    /// The catalog request deadline expired.
    #[error("catalog request timed out, please retry later")]
    UpstreamTimeout(#[source] FetchError),

    /// The catalog page looks like a bot challenge or is not a real page.
    #[error("catalog page rejected ({classification}), please retry later")]
    ChallengeOrMalformedContent {
        /// Why the page was rejected.
        classification: Classification,
    },

    /// No usable export link on the catalog page.
    #[error(transparent)]
    ExportLinkNotFound(#[from] ExtractError),

    /// The export download failed on every attempt.
    #[error("export download failed: {0}")]
    DownloadExhausted(#[source] FetchError),

    /// The export could not be written to staging.
    #[error("failed to stage export: {0}")]
    Staging(#[source] StageError),

    /// The bulk load failed; staged files stay in place.
    #[error("import failed: {0}")]
    ImportFailure(#[source] ImportError),

    /// Moving loaded files into the archive failed.
    #[error("archive failed: {0}")]
    ArchiveFailure(#[source] ImportError),

    /// A panic caught at the pipeline boundary.
    #[error("unexpected failure: {0}")]
    Unclassified(String),
}

impl PipelineError {
    /// Maps a catalog fetch error, separating deadline expiry from other failures.
    #[must_use]
    pub fn catalog(error: FetchError) -> Self {
        if error.is_timeout() {
            Self::UpstreamTimeout(error)
        } else {
            Self::UpstreamUnavailable(error)
        }
    }

    /// HTTP status code reported for this failure.
    #[must_use]
    pub fn http_code(&self) -> u16 {
        match self {
            Self::BadInput => 400,
            Self::UpstreamTimeout(_) => 504,
            Self::ExportLinkNotFound(ExtractError::InvalidHref { .. }) => 500,
            Self::ExportLinkNotFound(_) => 404,
            Self::UpstreamStatus { .. }
            | Self::UpstreamUnavailable(_)
            | Self::ChallengeOrMalformedContent { .. }
            | Self::DownloadExhausted(_)
            | Self::Staging(_)
            | Self::ImportFailure(_)
            | Self::ArchiveFailure(_)
            | Self::Unclassified(_) => 500,
        }
    }
}

impl From<StageError> for PipelineError {
    fn from(error: StageError) -> Self {
        match error {
            StageError::Download(e) => Self::DownloadExhausted(e),
            other @ StageError::Io { .. } => Self::Staging(other),
        }
    }
}

impl From<ImportError> for PipelineError {
    fn from(error: ImportError) -> Self {
        if error.is_archive() {
            Self::ArchiveFailure(error)
        } else {
            Self::ImportFailure(error)
        }
    }
}
