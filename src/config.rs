//! Pipeline configuration passed explicitly into [`Pipeline`](crate::Pipeline).
//!
//! Staging and archive locations, the catalog origin and the fetch settings
//! all live here; nothing in the pipeline reads process-wide state.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::fetch::FetchSettings;

/// Vendor catalog origin used when none is configured.
pub const DEFAULT_CATALOG_ORIGIN: &str = "https://www.mouser.tw";

/// Path of the catalog search page, relative to the origin.
pub const CATALOG_SEARCH_PATH: &str = "/c/";

/// Query parameter carrying the part number on the search page.
pub const CATALOG_QUERY_PARAM: &str = "q";

/// `id` attribute of the anchor behind the catalog's export button.
pub const DEFAULT_EXPORT_ANCHOR_ID: &str = "btn3";

/// Default staging directory (process-relative).
pub const DEFAULT_STAGING_DIR: &str = "downloads";

/// Default archive directory (process-relative).
pub const DEFAULT_ARCHIVE_DIR: &str = "downloads_bak";

/// Extension of staged export files.
pub const EXPORT_EXTENSION: &str = "csv";

/// Configuration errors detected while building a [`PipelineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The catalog origin is not a valid URL.
    #[error("invalid catalog origin '{origin}': {source}")]
    InvalidOrigin {
        /// The rejected origin string.
        origin: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// The catalog origin does not use http or https.
    #[error("catalog origin must be http or https: {origin}")]
    UnsupportedScheme {
        /// The rejected origin string.
        origin: String,
    },

    /// The export anchor id is empty.
    #[error("export anchor id must not be empty")]
    EmptyAnchorId,

    /// A configured directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    Directory {
        /// The directory that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Everything one [`Pipeline`](crate::Pipeline) needs to know about its environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    catalog_origin: Url,
    search_base: Url,
    export_anchor_id: String,
    staging_dir: PathBuf,
    archive_dir: PathBuf,
    fetch: FetchSettings,
}

impl PipelineConfig {
    /// Builds a configuration for the given catalog origin with default
    /// directories, anchor id and fetch settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the origin is not an absolute http(s) URL.
    pub fn new(catalog_origin: &str) -> Result<Self, ConfigError> {
        let origin = Url::parse(catalog_origin).map_err(|source| ConfigError::InvalidOrigin {
            origin: catalog_origin.to_string(),
            source,
        })?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                origin: catalog_origin.to_string(),
            });
        }
        let search_base =
            origin
                .join(CATALOG_SEARCH_PATH)
                .map_err(|source| ConfigError::InvalidOrigin {
                    origin: catalog_origin.to_string(),
                    source,
                })?;

        Ok(Self {
            catalog_origin: origin,
            search_base,
            export_anchor_id: DEFAULT_EXPORT_ANCHOR_ID.to_string(),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            archive_dir: PathBuf::from(DEFAULT_ARCHIVE_DIR),
            fetch: FetchSettings::default(),
        })
    }

    /// Sets the staging and archive directories.
    #[must_use]
    pub fn with_directories(
        mut self,
        staging_dir: impl Into<PathBuf>,
        archive_dir: impl Into<PathBuf>,
    ) -> Self {
        self.staging_dir = staging_dir.into();
        self.archive_dir = archive_dir.into();
        self
    }

    /// Sets the `id` of the export anchor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyAnchorId`] for a blank id.
    pub fn with_export_anchor_id(mut self, anchor_id: &str) -> Result<Self, ConfigError> {
        let anchor_id = anchor_id.trim();
        if anchor_id.is_empty() {
            return Err(ConfigError::EmptyAnchorId);
        }
        self.export_anchor_id = anchor_id.to_string();
        Ok(self)
    }

    /// Replaces the fetch settings.
    #[must_use]
    pub fn with_fetch_settings(mut self, fetch: FetchSettings) -> Self {
        self.fetch = fetch;
        self
    }

    /// The catalog origin; relative export links resolve against it.
    #[must_use]
    pub fn catalog_origin(&self) -> &Url {
        &self.catalog_origin
    }

    /// The `id` attribute of the export anchor.
    #[must_use]
    pub fn export_anchor_id(&self) -> &str {
        &self.export_anchor_id
    }

    /// Directory holding freshly downloaded exports.
    #[must_use]
    pub fn staging_dir(&self) -> &PathBuf {
        &self.staging_dir
    }

    /// Directory receiving imported exports.
    #[must_use]
    pub fn archive_dir(&self) -> &PathBuf {
        &self.archive_dir
    }

    /// HTTP session settings.
    #[must_use]
    pub fn fetch(&self) -> &FetchSettings {
        &self.fetch
    }

    /// Builds the catalog search URL for a part number.
    ///
    /// The query is carried verbatim as the `q` parameter value
    /// (percent-encoded where the URL grammar requires it).
    #[must_use]
    pub fn search_url(&self, query: &str) -> Url {
        let mut url = self.search_base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair(CATALOG_QUERY_PARAM, query);
        url
    }

    /// Creates the staging and archive directories if they are missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Directory`] if either directory cannot be created.
    #[instrument(skip(self), fields(staging = %self.staging_dir.display(), archive = %self.archive_dir.display()))]
    pub async fn ensure_directories(&self) -> Result<(), ConfigError> {
        for dir in [&self.staging_dir, &self.archive_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ConfigError::Directory {
                    path: dir.clone(),
                    source,
                })?;
        }
        debug!("pipeline directories ready");
        Ok(())
    }
}
