//! Shared fixtures for integration tests: catalog pages, fast fetch settings,
//! flaky responders and instrumented bulk loaders.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use catalog_export::{
    BulkLoader, DelayRange, FetchSettings, ImportError, LoadReport, LoadedFile, Pipeline,
    PipelineConfig, RetryPolicy, list_staged_files,
};
use tempfile::TempDir;
use wiremock::{Respond, ResponseTemplate};

/// Part number used across the end-to-end tests.
pub const PART: &str = "IAM-20680";

/// Export payload served by the stub export endpoint.
pub const EXPORT_CSV: &str = "Mfr Part,Manufacturer,Qty\nIAM-20680,TDK InvenSense,10\n";

/// Builds a catalog page long enough to pass classification, embedding `extra`.
pub fn catalog_page(extra: &str) -> String {
    let mut page = String::from(
        "<!DOCTYPE html><html lang=\"zh-TW\"><head><title>IAM-20680</title></head><body>",
    );
    page.push_str(extra);
    while page.chars().count() < 1200 {
        page.push_str("<p class=\"spec\">6-axis MEMS motion tracking device, SPI/I2C</p>\n");
    }
    page.push_str("</body></html>");
    page
}

/// Catalog page whose export anchor points at `href`.
pub fn catalog_page_with_export(href: &str) -> String {
    catalog_page(&format!(
        "<a id=\"btn3\" class=\"btn\" href=\"{href}\">Export CSV</a>"
    ))
}

/// A bot-challenge interstitial carrying all three signature markers.
pub fn challenge_page() -> String {
    catalog_page(
        "<script>(function(){var s=window.XMLHttpRequest.prototype.send;\
         window.XMLHttpRequest.prototype.send=function(){return s.apply(this,arguments)};\
         location.reload(true);})();</script>",
    )
}

/// Fetch settings with no jitter, a short backoff and a short deadline.
pub fn fast_settings(max_attempts: u32) -> FetchSettings {
    FetchSettings {
        request_timeout: Duration::from_secs(5),
        accept_invalid_certs: false,
        pre_request_delay: DelayRange::disabled(),
        retry: RetryPolicy::new(max_attempts, Duration::from_millis(10)),
    }
}

/// Staging and archive directories under one temp dir.
pub struct Workspace {
    pub temp: TempDir,
    pub staging: PathBuf,
    pub archive: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let staging = temp.path().join("downloads");
        let archive = temp.path().join("downloads_bak");
        std::fs::create_dir_all(&staging).expect("create staging");
        std::fs::create_dir_all(&archive).expect("create archive");
        Self {
            temp,
            staging,
            archive,
        }
    }

    pub fn config(&self, origin: &str, settings: FetchSettings) -> PipelineConfig {
        PipelineConfig::new(origin)
            .expect("valid origin")
            .with_directories(&self.staging, &self.archive)
            .with_fetch_settings(settings)
    }

    pub fn pipeline(&self, origin: &str, loader: Arc<dyn BulkLoader>) -> Pipeline {
        Pipeline::new(self.config(origin, fast_settings(3)), loader)
    }
}

/// File names directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Fails the first `fail_count` requests with 500, then serves `body`.
pub struct FlakyResponder {
    requests: Arc<AtomicUsize>,
    fail_count: usize,
    body: Vec<u8>,
}

impl FlakyResponder {
    pub fn new(fail_count: usize, body: &[u8]) -> (Self, Arc<AtomicUsize>) {
        let requests = Arc::new(AtomicUsize::new(0));
        (
            Self {
                requests: Arc::clone(&requests),
                fail_count,
                body: body.to_vec(),
            },
            requests,
        )
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.requests.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(500).set_body_string("internal server error")
        } else {
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/csv")
                .set_body_bytes(self.body.clone())
        }
    }
}

/// One observed `load_directory` call.
#[derive(Debug, Clone)]
pub struct LoadCall {
    pub dir: PathBuf,
    pub files: Vec<String>,
}

/// Loader that records each call and reports every staged file as loaded.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    calls: Mutex<Vec<LoadCall>>,
}

impl RecordingLoader {
    pub fn calls(&self) -> Vec<LoadCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl BulkLoader for RecordingLoader {
    async fn load_directory(&self, staging_dir: &Path) -> Result<LoadReport, ImportError> {
        let paths = list_staged_files(staging_dir).await?;
        let files: Vec<LoadedFile> = paths
            .into_iter()
            .map(|path| LoadedFile {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path,
                rows: 1,
            })
            .collect();
        self.calls.lock().expect("calls lock").push(LoadCall {
            dir: staging_dir.to_path_buf(),
            files: files.iter().map(|f| f.file_name.clone()).collect(),
        });
        Ok(LoadReport { files })
    }
}

/// Loader whose store is always unavailable.
#[derive(Debug, Default)]
pub struct FailingLoader {
    pub calls: AtomicUsize,
}

#[async_trait]
impl BulkLoader for FailingLoader {
    async fn load_directory(&self, _staging_dir: &Path) -> Result<LoadReport, ImportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ImportError::rejected("store unavailable"))
    }
}

/// Loader that panics, standing in for a bug inside a stage.
#[derive(Debug, Default)]
pub struct PanickingLoader;

#[async_trait]
impl BulkLoader for PanickingLoader {
    async fn load_directory(&self, _staging_dir: &Path) -> Result<LoadReport, ImportError> {
        panic!("loader exploded");
    }
}
