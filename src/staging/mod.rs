//! Download stage: fetches the export and lands it in the staging directory.
//!
//! Bytes are written to a hidden `.part` sibling, flushed and synced, then
//! renamed to `{query}_{yyyyMMddHHmmss}.csv`. Anything listing the staging
//! directory for `.csv` files therefore never sees a half-written export.

mod filename;

use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};

use crate::extract::ExportLink;
use crate::fetch::{FetchError, FetchSession};

pub use filename::{TIMESTAMP_FORMAT, partial_file_name, staged_file_name};

/// Errors raised by the download stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// The export could not be downloaded within the retry budget.
    #[error(transparent)]
    Download(#[from] FetchError),

    /// Writing the staged file failed.
    #[error("IO error staging {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// An export file sitting in the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Full path of the staged file.
    pub path: PathBuf,
    /// File name only (`{query}_{timestamp}.csv`).
    pub file_name: String,
    /// Size in bytes.
    pub bytes: u64,
}

/// Writes downloaded exports into one staging directory.
#[derive(Debug, Clone)]
pub struct DownloadStage {
    staging_dir: PathBuf,
}

impl DownloadStage {
    /// Creates a stage writing into `staging_dir`.
    #[must_use]
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    /// The staging directory.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Downloads `link` through `session` and stages it under a name derived
    /// from `query` and the current local time.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Download`] when the retry budget is exhausted
    /// (nothing is written), or [`StageError::Io`] when writing fails.
    #[instrument(skip(self, session), fields(query = %query, url = %link))]
    pub async fn stage(
        &self,
        session: &FetchSession,
        query: &str,
        link: &ExportLink,
    ) -> Result<StagedFile, StageError> {
        let file_name = staged_file_name(query, &Local::now());
        let bytes = session.download(link.url()).await?;
        let staged = self.persist(&file_name, &bytes).await?;
        info!(path = %staged.path.display(), bytes = staged.bytes, "export staged");
        Ok(staged)
    }

    /// Writes `bytes` to `file_name` in the staging directory via a `.part`
    /// sibling and a rename. An existing file of the same name is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Io`]; the `.part` file is removed on failure.
    pub async fn persist(&self, file_name: &str, bytes: &[u8]) -> Result<StagedFile, StageError> {
        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|e| StageError::io(&self.staging_dir, e))?;

        let final_path = self.staging_dir.join(file_name);
        let partial_path = self.staging_dir.join(partial_file_name(file_name));

        let write_result = write_synced(&partial_path, bytes).await;
        let result = match write_result {
            Ok(()) => tokio::fs::rename(&partial_path, &final_path)
                .await
                .map_err(|e| StageError::io(&final_path, e)),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            debug!(path = %partial_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(e);
        }

        Ok(StagedFile {
            path: final_path,
            file_name: file_name.to_string(),
            bytes: bytes.len() as u64,
        })
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), StageError> {
    let file = File::create(path)
        .await
        .map_err(|e| StageError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .await
        .map_err(|e| StageError::io(path, e))?;
    writer.flush().await.map_err(|e| StageError::io(path, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| StageError::io(path, e))?;
    Ok(())
}
