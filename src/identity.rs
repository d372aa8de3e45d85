//! Browser identity presented to the vendor catalog.
//!
//! The catalog serves anti-bot challenges to clients that do not look like a
//! desktop browser, so every request carries the same Chrome profile headers
//! plus a consent/locale cookie pair.

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use url::Url;

/// Desktop Chrome User-Agent sent on every catalog and export request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
    image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

const BROWSER_ACCEPT_LANGUAGE: &str = "zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7";

/// Client hints and fetch metadata, in the order Chrome sends them.
const CLIENT_HINT_HEADERS: &[(&str, &str)] = &[
    (
        "sec-ch-ua",
        r#""Chromium";v="134", "Not:A-Brand";v="24", "Google Chrome";v="134""#,
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", r#""Windows""#),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "same-origin"),
    ("sec-fetch-user", "?1"),
];

/// Cookies seeded into every session before the first request.
pub const SESSION_SEED_COOKIES: &[&str] = &["cookieconsent_status=allow", "language=zh-TW"];

/// Builds the identity header set for a catalog origin.
///
/// `Accept-Encoding` is left to the HTTP client, which only decodes bodies
/// when it set that header itself.
///
/// Returns `None` if the origin cannot be expressed as a `Referer` value.
#[must_use]
pub(crate) fn browser_headers(origin: &Url) -> Option<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(REFERER, HeaderValue::from_str(origin.as_str()).ok()?);
    for &(name, value) in CLIENT_HINT_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    Some(headers)
}
