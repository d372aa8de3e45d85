//! Heuristic detection of anti-bot challenges in fetched catalog pages.
//!
//! The vendor sometimes answers a catalog request with a tiny script page that
//! fingerprints the browser and reloads itself instead of the real results.
//! [`SignatureClassifier`] recognizes that page by a marker signature. This is
//! a best-effort match: a challenge page that drops one of the markers passes
//! as legitimate, and a real page quoting all three markers is rejected.
//!
//! Classification rules sit behind the [`ContentClassifier`] trait so they can
//! evolve without touching pipeline control flow.

use std::fmt;

/// Outcome of classifying a catalog page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A real catalog page.
    Legitimate,
    /// The body is shorter than the minimum plausible page.
    TooShort,
    /// The body matches the anti-bot challenge signature.
    ChallengeDetected,
    /// The body has no HTML document marker.
    NotHtml,
}

impl Classification {
    /// Returns true only for [`Classification::Legitimate`].
    #[must_use]
    pub fn is_legitimate(self) -> bool {
        self == Self::Legitimate
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Legitimate => "legitimate",
            Self::TooShort => "too short",
            Self::ChallengeDetected => "challenge detected",
            Self::NotHtml => "not html",
        };
        f.write_str(label)
    }
}

/// Pluggable page classification strategy.
pub trait ContentClassifier: Send + Sync + fmt::Debug {
    /// Classifies a catalog page body.
    fn classify(&self, body: &str) -> Classification;
}

/// HTML document marker every legitimate page contains.
pub const HTML_MARKER: &str = "<html";

/// Minimum body length, in characters, of a legitimate page.
pub const MIN_PAGE_CHARS: usize = 1000;

/// Markers that together identify the challenge page: a script block, the
/// XHR fingerprinting hook and a forced reload.
pub const CHALLENGE_MARKERS: [&str; 3] = [
    "<script",
    "window.XMLHttpRequest.prototype.send",
    "location.reload(true);",
];

/// Marker-signature classifier.
///
/// Checks, in order: HTML marker present, minimum length reached, challenge
/// signature absent.
#[derive(Debug, Clone)]
pub struct SignatureClassifier {
    html_marker: String,
    min_chars: usize,
    challenge_markers: Vec<String>,
}

impl Default for SignatureClassifier {
    fn default() -> Self {
        Self {
            html_marker: HTML_MARKER.to_string(),
            min_chars: MIN_PAGE_CHARS,
            challenge_markers: CHALLENGE_MARKERS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl SignatureClassifier {
    /// Creates a classifier with custom markers and threshold.
    ///
    /// An empty `challenge_markers` list disables challenge detection.
    #[must_use]
    pub fn new(
        html_marker: impl Into<String>,
        min_chars: usize,
        challenge_markers: Vec<String>,
    ) -> Self {
        Self {
            html_marker: html_marker.into(),
            min_chars,
            challenge_markers,
        }
    }

    fn matches_challenge(&self, body: &str) -> bool {
        !self.challenge_markers.is_empty()
            && self
                .challenge_markers
                .iter()
                .all(|marker| body.contains(marker.as_str()))
    }
}

impl ContentClassifier for SignatureClassifier {
    fn classify(&self, body: &str) -> Classification {
        if !body.contains(self.html_marker.as_str()) {
            return Classification::NotHtml;
        }
        if body.chars().count() < self.min_chars {
            return Classification::TooShort;
        }
        if self.matches_challenge(body) {
            return Classification::ChallengeDetected;
        }
        Classification::Legitimate
    }
}
