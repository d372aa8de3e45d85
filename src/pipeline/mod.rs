//! Pipeline orchestrator.
//!
//! One [`Pipeline::run`] call takes a query through
//! `Start → Fetching → Classifying → Extracting → Downloading → Importing →
//! Archiving → Done`, leaving early on the first failure. Whatever happens,
//! including a panic inside a stage, the run ends in exactly one
//! [`PipelineResult`].

mod error;
mod orchestrator;
mod query;

use std::fmt;

use serde::Serialize;

pub use error::PipelineError;
pub use orchestrator::Pipeline;
pub use query::Query;

/// Stages of a pipeline run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Query validated, nothing sent yet.
    Start,
    /// Requesting the catalog search page.
    Fetching,
    /// Checking the page for bot challenges.
    Classifying,
    /// Locating the export link.
    Extracting,
    /// Downloading the export into staging.
    Downloading,
    /// Bulk-loading staged files.
    Importing,
    /// Moving loaded files into the archive.
    Archiving,
    /// Finished successfully.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Fetching => "fetching",
            Self::Classifying => "classifying",
            Self::Extracting => "extracting",
            Self::Downloading => "downloading",
            Self::Importing => "importing",
            Self::Archiving => "archiving",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome tag of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    /// The export was downloaded, imported and archived.
    #[serde(rename = "OK")]
    Ok,
    /// The run failed.
    #[serde(rename = "NG")]
    Ng,
}

/// The single terminal result of a pipeline run.
///
/// Serializes to `{"status": "OK"|"NG", "message": ...}`; the HTTP code
/// travels alongside and is applied by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    /// Success or failure.
    pub status: Status,
    /// Human-readable description.
    pub message: String,
    /// HTTP status code for the response.
    #[serde(skip)]
    pub http_code: u16,
}

impl PipelineResult {
    /// A successful result (HTTP 200).
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            http_code: 200,
        }
    }

    /// A failed result carrying the error's message and code.
    #[must_use]
    pub fn failure(error: &PipelineError) -> Self {
        Self {
            status: Status::Ng,
            message: error.to_string(),
            http_code: error.http_code(),
        }
    }

    /// Returns true for [`Status::Ok`].
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}
