//! Browser-like HTTP session for catalog pages and export downloads.
//!
//! This module provides the [`FetchSession`] used by one pipeline run. The
//! session keeps a cookie jar across the catalog visit and the export download
//! (the vendor ties download authorization to cookies set on the catalog page).
//!
//! # Features
//!
//! - Fixed Chrome identity headers and a seeded consent/locale cookie pair
//! - Uniform random delay before the first request ([`DelayRange`])
//! - Fixed-budget, fixed-backoff retries for export downloads ([`RetryPolicy`])
//! - Per-request deadline (30 seconds by default)
//! - Optional TLS trust override for the vendor host
//!
//! # Example
//!
//! ```no_run
//! use catalog_export::fetch::{FetchSession, FetchSettings};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let origin = Url::parse("https://www.mouser.tw")?;
//! let session = FetchSession::open(&origin, FetchSettings::default())?;
//! session.pause_before_first_request().await;
//! let page = session.fetch(&origin.join("/c/?q=IAM-20680")?).await?;
//! println!("HTTP {} ({} chars)", page.status, page.body.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod delay;
mod error;
mod retry;

use std::time::Duration;

pub use client::{FetchSession, PageContent};
pub use delay::DelayRange;
pub use error::FetchError;
pub use retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF, RetryDecision, RetryPolicy};

/// Default per-request deadline (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for one [`FetchSession`].
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Deadline applied to every request, connect included.
    pub request_timeout: Duration,
    /// Skip TLS certificate validation (explicit trust override for the vendor host).
    pub accept_invalid_certs: bool,
    /// Random pause taken before the first request of a session.
    pub pre_request_delay: DelayRange,
    /// Retry budget for export downloads.
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: true,
            pre_request_delay: DelayRange::default(),
            retry: RetryPolicy::default(),
        }
    }
}
