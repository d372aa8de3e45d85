//! CLI argument definitions using clap derive macros.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use catalog_export::config::{
    DEFAULT_ARCHIVE_DIR, DEFAULT_CATALOG_ORIGIN, DEFAULT_EXPORT_ANCHOR_ID, DEFAULT_STAGING_DIR,
};
use catalog_export::{DEFAULT_MAX_RETRIES, DelayRange, FetchSettings, RetryPolicy};

/// Serve catalog exports over HTTP.
///
/// Each `GET /api/csv/search?query=<part>` visits the vendor catalog, downloads
/// the generated CSV export, bulk-loads it into SQLite and archives the file.
#[derive(Parser, Debug)]
#[command(name = "catalog-export")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Address the HTTP server listens on
    #[arg(long, env = "CATALOG_EXPORT_BIND", default_value = "0.0.0.0:9980")]
    pub bind: SocketAddr,

    /// Directory downloaded exports are staged in
    #[arg(long, env = "CATALOG_EXPORT_STAGING_DIR", default_value = DEFAULT_STAGING_DIR)]
    pub staging_dir: PathBuf,

    /// Directory imported exports are moved to
    #[arg(long, env = "CATALOG_EXPORT_ARCHIVE_DIR", default_value = DEFAULT_ARCHIVE_DIR)]
    pub archive_dir: PathBuf,

    /// SQLite database file exports are imported into
    #[arg(long, env = "CATALOG_EXPORT_DATABASE", default_value = "catalog_export.db")]
    pub database: PathBuf,

    /// Vendor catalog origin
    #[arg(long, env = "CATALOG_EXPORT_ORIGIN", default_value = DEFAULT_CATALOG_ORIGIN)]
    pub catalog_origin: String,

    /// Element id of the export anchor on the catalog page
    #[arg(long, env = "CATALOG_EXPORT_ANCHOR_ID", default_value = DEFAULT_EXPORT_ANCHOR_ID)]
    pub export_anchor_id: String,

    /// Download attempts per export (1-10)
    #[arg(short = 'r', long, env = "CATALOG_EXPORT_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Pause between download attempts in milliseconds (max 60000)
    #[arg(long, env = "CATALOG_EXPORT_RETRY_BACKOFF_MS", default_value_t = 2000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_backoff_ms: u64,

    /// Lower bound of the random pause before the first request, in milliseconds
    #[arg(long, env = "CATALOG_EXPORT_MIN_DELAY_MS", default_value_t = 2000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub min_delay_ms: u64,

    /// Upper bound of the random pause before the first request, in milliseconds
    #[arg(long, env = "CATALOG_EXPORT_MAX_DELAY_MS", default_value_t = 5000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub max_delay_ms: u64,

    /// Per-request deadline in seconds (1-600)
    #[arg(long, env = "CATALOG_EXPORT_REQUEST_TIMEOUT_SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub request_timeout_secs: u64,

    /// Validate the vendor's TLS certificate (validation is skipped by default)
    #[arg(long, env = "CATALOG_EXPORT_VERIFY_TLS")]
    pub verify_tls: bool,
}

impl Args {
    /// Fetch settings derived from the timing and TLS flags.
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            accept_invalid_certs: !self.verify_tls,
            pre_request_delay: DelayRange::new(
                Duration::from_millis(self.min_delay_ms),
                Duration::from_millis(self.max_delay_ms),
            ),
            retry: RetryPolicy::new(
                u32::from(self.max_retries),
                Duration::from_millis(self.retry_backoff_ms),
            ),
        }
    }
}
