//! Moves imported exports from staging into the archive directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::ImportError;

/// Moves `from` into `archive_dir`, keeping its file name, and returns the new path.
///
/// A rename is tried first; when staging and archive sit on different
/// filesystems the file is copied and the original removed. An archived file
/// of the same name is replaced.
pub(crate) async fn move_into_archive(
    from: &Path,
    archive_dir: &Path,
) -> Result<PathBuf, ImportError> {
    let Some(file_name) = from.file_name() else {
        return Err(ImportError::Archive {
            from: from.to_path_buf(),
            to: archive_dir.to_path_buf(),
            source: std::io::Error::new(ErrorKind::InvalidInput, "staged path has no file name"),
        });
    };
    let to = archive_dir.join(file_name);
    let archive_error = |source| ImportError::Archive {
        from: from.to_path_buf(),
        to: to.clone(),
        source,
    };

    tokio::fs::create_dir_all(archive_dir)
        .await
        .map_err(archive_error)?;

    match tokio::fs::rename(from, &to).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), "archive on another filesystem, copying");
            tokio::fs::copy(from, &to).await.map_err(archive_error)?;
            tokio::fs::remove_file(from).await.map_err(archive_error)?;
        }
        Err(e) => return Err(archive_error(e)),
    }

    info!(from = %from.display(), to = %to.display(), "moved export to archive");
    Ok(to)
}
