//! Catalog Export Library
//!
//! This library implements a scrape-download-import pipeline: given a part
//! number, it visits a vendor catalog page, locates the generated export link,
//! downloads the tabular export into a staging directory, bulk-loads it into a
//! relational store and archives the source file.
//!
//! # Architecture
//!
//! The library is organized into the following modules, leaves first:
//! - [`fetch`] - Browser-like HTTP session with cookies, jitter and download retries
//! - [`detect`] - Heuristic anti-bot challenge detection for fetched pages
//! - [`extract`] - Export link extraction from catalog markup
//! - [`staging`] - Download stage writing exports into the staging directory
//! - [`import`] - Bulk load of staged files into the store, then archival
//! - [`pipeline`] - Orchestrator mapping every run to one [`PipelineResult`]
//! - [`api`] - HTTP surface (`GET /`, `GET /api/csv/search`)
//! - [`db`] - SQLite connection and schema management

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod db;
pub mod detect;
pub mod extract;
pub mod fetch;
pub mod import;
pub mod pipeline;
pub mod staging;
pub(crate) mod identity;

// Re-export commonly used types
pub use api::{AppState, create_router, serve};
pub use config::{ConfigError, PipelineConfig};
pub use db::{Database, DbError};
pub use detect::{Classification, ContentClassifier, SignatureClassifier};
pub use extract::{ExportLink, ExportLinkExtractor, ExtractError};
pub use fetch::{
    DEFAULT_MAX_RETRIES, DelayRange, FetchError, FetchSession, FetchSettings, PageContent,
    RetryDecision, RetryPolicy,
};
pub use import::{
    BulkLoader, ImportError, ImportSummary, LoadReport, LoadedFile, SqliteBulkLoader,
    import_and_archive, list_staged_files,
};
pub use pipeline::{Pipeline, PipelineError, PipelineResult, Query, Stage, Status};
pub use staging::{DownloadStage, StageError, StagedFile};
