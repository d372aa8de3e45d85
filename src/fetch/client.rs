//! HTTP session wrapper shared by the catalog fetch and the export download.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use reqwest::Client;
use reqwest::cookie::Jar;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::FetchError;
use super::retry::RetryDecision;
use super::FetchSettings;
use crate::identity;

/// Raw catalog response: HTTP status and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// The HTTP status code.
    pub status: u16,
    /// The decoded response body.
    pub body: String,
}

impl PageContent {
    /// Returns true for HTTP 200.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Cookie-carrying HTTP session bound to one pipeline run.
///
/// The session owns its transport and cookie jar; dropping it releases both,
/// whichever way the run ends. A session that never sent a request releases
/// nothing but itself.
#[derive(Debug)]
pub struct FetchSession {
    client: Client,
    settings: FetchSettings,
    requests_sent: AtomicU32,
}

impl FetchSession {
    /// Opens a session for the given catalog origin.
    ///
    /// The cookie jar is seeded with the consent/locale pair for `origin`, and
    /// every request carries the browser identity headers.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the identity headers or the client cannot be built.
    #[instrument(skip(settings), fields(origin = %origin))]
    pub fn open(origin: &Url, settings: FetchSettings) -> Result<Self, FetchError> {
        let headers = identity::browser_headers(origin).ok_or_else(|| {
            FetchError::InvalidOrigin {
                origin: origin.to_string(),
            }
        })?;

        let jar = Arc::new(Jar::default());
        for cookie in identity::SESSION_SEED_COOKIES {
            jar.add_cookie_str(cookie, origin);
        }

        if settings.accept_invalid_certs {
            warn!(
                origin = %origin,
                "TLS certificate validation disabled for catalog session"
            );
        }

        let client = Client::builder()
            .connect_timeout(settings.request_timeout)
            .timeout(settings.request_timeout)
            .gzip(true)
            .default_headers(headers)
            .cookie_provider(jar)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|source| FetchError::ClientBuild { source })?;

        debug!("fetch session opened");
        Ok(Self {
            client,
            settings,
            requests_sent: AtomicU32::new(0),
        })
    }

    /// Sleeps for the configured random pause before the first request.
    pub async fn pause_before_first_request(&self) {
        self.settings.pre_request_delay.wait().await;
    }

    /// Number of requests this session has sent so far.
    #[must_use]
    pub fn requests_sent(&self) -> u32 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    /// Fetches a page and returns its status and body, whatever the status.
    ///
    /// Not retried: a failing catalog page is more likely a durable block.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Timeout`] when the deadline expires, or
    /// [`FetchError::Network`] for other transport failures.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<PageContent, FetchError> {
        debug!("fetching page");
        self.requests_sent.fetch_add(1, Ordering::Relaxed);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        debug!(status, chars = body.len(), "page fetched");
        Ok(PageContent { status, body })
    }

    /// Downloads a binary payload, retrying per the session's [`RetryPolicy`](super::RetryPolicy).
    ///
    /// Only HTTP 200 counts as success; any other status or transport error
    /// is retried after the fixed backoff. The attempt counter starts fresh on
    /// every call.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::RetriesExhausted`] carrying the last attempt's
    /// error once the budget is spent.
    #[instrument(skip(self), fields(url = %url, max_attempts = self.settings.retry.max_attempts()))]
    pub async fn download(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let policy = &self.settings.retry;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            info!(attempt, "downloading export");

            match self.download_once(url).await {
                Ok(bytes) => {
                    info!(attempt, bytes = bytes.len(), "export downloaded");
                    return Ok(bytes);
                }
                Err(e) => match policy.should_retry(attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        warn!(
                            attempt = next_attempt,
                            max_attempts = policy.max_attempts(),
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "retrying export download"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        warn!(%reason, error = %e, "giving up on export download");
                        return Err(FetchError::retries_exhausted(url.as_str(), attempt, e));
                    }
                },
            }
        }
    }

    async fn download_once(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::http_status(url.as_str(), status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;
        Ok(bytes.to_vec())
    }
}

impl Drop for FetchSession {
    fn drop(&mut self) {
        debug!(
            requests = self.requests_sent.load(Ordering::Relaxed),
            "fetch session released"
        );
    }
}
