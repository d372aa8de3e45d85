//! Import & archive stage.
//!
//! Every `.csv` file in the staging directory is handed to a [`BulkLoader`]
//! as one batch. Only after the loader reports success are the loaded files
//! moved to the archive directory, so a failed load leaves staging untouched
//! and the files are picked up again by the next successful request.
//!
//! The loader is a seam: production wires in [`SqliteBulkLoader`], tests use
//! recording or failing loaders.

mod archive;
mod error;
mod sqlite;

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, instrument};

pub use error::ImportError;
pub use sqlite::SqliteBulkLoader;

/// File extension of staged exports, matched case-insensitively.
const STAGED_EXTENSION: &str = "csv";

/// One file that a loader accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    /// Where the file sat in staging.
    pub path: PathBuf,
    /// File name only.
    pub file_name: String,
    /// Number of data rows loaded (header excluded).
    pub rows: u64,
}

/// Result of one bulk load over the staging directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Files loaded, in directory order.
    pub files: Vec<LoadedFile>,
}

impl LoadReport {
    /// Total rows across all loaded files.
    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.files.iter().map(|f| f.rows).sum()
    }
}

/// Outcome of [`import_and_archive`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// What the loader reported.
    pub loaded: LoadReport,
    /// Archive paths of the moved files.
    pub archived: Vec<PathBuf>,
}

/// Loads every staged export into the backing store in one call.
///
/// Implementations must be all-or-nothing: when an error is returned the
/// store holds none of this batch's rows.
#[async_trait]
pub trait BulkLoader: Send + Sync + Debug {
    /// Loads all staged `.csv` files found in `staging_dir`.
    async fn load_directory(&self, staging_dir: &Path) -> Result<LoadReport, ImportError>;
}

/// Lists the staged exports in `dir`, sorted by path.
///
/// Only regular files with a `.csv` extension count. Hidden files (including
/// in-flight `.part` downloads) are skipped.
///
/// # Errors
///
/// Returns [`ImportError::ListStaging`] if the directory cannot be read.
pub async fn list_staged_files(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let list_error = |source| ImportError::ListStaging {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(list_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
        let file_type = entry.file_type().await.map_err(list_error)?;
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        if is_staged_export(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_staged_export(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.'));
    let csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(STAGED_EXTENSION));
    !hidden && csv
}

/// Runs the loader over `staging_dir`.
///
/// # Errors
///
/// Propagates the loader's error; nothing is archived in that case.
#[instrument(skip(loader), fields(staging = %staging_dir.display()))]
pub async fn load_staged(
    loader: &dyn BulkLoader,
    staging_dir: &Path,
) -> Result<LoadReport, ImportError> {
    let report = loader.load_directory(staging_dir).await?;
    info!(
        files = report.files.len(),
        rows = report.total_rows(),
        "bulk load complete"
    );
    Ok(report)
}

/// Moves every file in `report` into `archive_dir`.
///
/// # Errors
///
/// Returns [`ImportError::Archive`] on the first file that cannot be moved.
/// Files moved before the failure stay archived.
#[instrument(skip(report), fields(archive = %archive_dir.display(), files = report.files.len()))]
pub async fn archive_loaded(
    report: &LoadReport,
    archive_dir: &Path,
) -> Result<Vec<PathBuf>, ImportError> {
    let mut archived = Vec::with_capacity(report.files.len());
    for file in &report.files {
        archived.push(archive::move_into_archive(&file.path, archive_dir).await?);
    }
    Ok(archived)
}

/// Bulk-loads the staging directory and, on success, archives what was loaded.
///
/// `on_loaded` runs once between the two steps, after the loader has
/// accepted the batch and before the first file moves.
///
/// # Errors
///
/// Returns the loader's error (staging untouched) or an
/// [`ImportError::Archive`] if moving a loaded file fails.
pub async fn import_and_archive<F>(
    loader: &dyn BulkLoader,
    staging_dir: &Path,
    archive_dir: &Path,
    on_loaded: F,
) -> Result<ImportSummary, ImportError>
where
    F: FnOnce(&LoadReport) + Send,
{
    let loaded = load_staged(loader, staging_dir).await?;
    on_loaded(&loaded);
    let archived = archive_loaded(&loaded, archive_dir).await?;
    Ok(ImportSummary { loaded, archived })
}
