//! Export link extraction from catalog page markup.

use std::fmt;

use scraper::{ElementRef, Html};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors raised while locating the export link.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No anchor carries the export id.
    #[error("download button not found (no anchor with id '{anchor_id}')")]
    AnchorNotFound {
        /// The id that was searched for.
        anchor_id: String,
    },

    /// The export anchor has no usable `href`.
    #[error("download button not found (anchor '{anchor_id}' has no href)")]
    MissingHref {
        /// The id of the anchor.
        anchor_id: String,
    },

    /// The `href` carries a scheme the export cannot be fetched over
    /// (`javascript:`, `mailto:`, `ftp://` and the like).
    #[error("download button not found (anchor '{anchor_id}' has a '{scheme}:' href)")]
    UnsupportedScheme {
        /// The id of the anchor.
        anchor_id: String,
        /// The href's scheme, lowercased.
        scheme: String,
    },

    /// The `href` cannot be turned into an absolute URL.
    #[error("download button has an invalid href '{href}': {source}")]
    InvalidHref {
        /// The raw attribute value.
        href: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
}

/// Absolute URL of the catalog's generated export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLink {
    url: Url,
    relative: bool,
}

impl ExportLink {
    /// The absolute export URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// True if the page's `href` was relative and was resolved against the origin.
    #[must_use]
    pub fn was_relative(&self) -> bool {
        self.relative
    }
}

impl fmt::Display for ExportLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.url, f)
    }
}

/// Finds the export anchor by its `id` attribute and resolves its `href`.
#[derive(Debug, Clone)]
pub struct ExportLinkExtractor {
    anchor_id: String,
    origin: Url,
}

impl ExportLinkExtractor {
    /// Creates an extractor; relative hrefs resolve against `origin`.
    #[must_use]
    pub fn new(anchor_id: impl Into<String>, origin: Url) -> Self {
        Self {
            anchor_id: anchor_id.into(),
            origin,
        }
    }

    /// Locates the first `<a>` with the configured id and returns its absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::AnchorNotFound`] when no such anchor exists,
    /// [`ExtractError::MissingHref`] when it has a blank or missing `href`,
    /// [`ExtractError::UnsupportedScheme`] when the `href` is not http(s),
    /// or [`ExtractError::InvalidHref`] when the value is not a URL.
    pub fn extract(&self, body: &str) -> Result<ExportLink, ExtractError> {
        let document = Html::parse_document(body);

        let anchor = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|element| {
                element.value().name().eq_ignore_ascii_case("a")
                    && element.value().id() == Some(self.anchor_id.as_str())
            })
            .ok_or_else(|| ExtractError::AnchorNotFound {
                anchor_id: self.anchor_id.clone(),
            })?;

        let href = anchor
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or_else(|| ExtractError::MissingHref {
                anchor_id: self.anchor_id.clone(),
            })?;

        let link = self.resolve(href)?;
        debug!(href, url = %link.url, relative = link.relative, "export link located");
        Ok(link)
    }

    fn resolve(&self, href: &str) -> Result<ExportLink, ExtractError> {
        let invalid = |source| ExtractError::InvalidHref {
            href: href.to_string(),
            source,
        };

        if href.starts_with("//") {
            return Ok(ExportLink {
                url: Url::parse(&format!("https:{href}")).map_err(invalid)?,
                relative: false,
            });
        }

        match Url::parse(href) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(ExportLink {
                url,
                relative: false,
            }),
            Ok(url) => Err(ExtractError::UnsupportedScheme {
                anchor_id: self.anchor_id.clone(),
                scheme: url.scheme().to_string(),
            }),
            // No scheme: a path (or query) on the catalog origin.
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(ExportLink {
                url: self.origin.join(href).map_err(invalid)?,
                relative: true,
            }),
            Err(source) => Err(invalid(source)),
        }
    }
}
