//! Validated search query.

use std::fmt;

use super::PipelineError;

/// A non-blank part-number query.
///
/// Surrounding whitespace is trimmed on purpose, so `" IAM-20680 "` searches,
/// names and logs exactly like `"IAM-20680"`. Everything between the first
/// and last non-blank character is kept as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Validates a raw query parameter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BadInput`] if the parameter is missing,
    /// empty, or whitespace only.
    pub fn parse(raw: Option<&str>) -> Result<Self, PipelineError> {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() => Ok(Self(value.to_string())),
            _ => Err(PipelineError::BadInput),
        }
    }

    /// The query text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let query = Query::parse(Some("  IAM-20680 ")).unwrap();
        assert_eq!(query.as_str(), "IAM-20680");
        assert_eq!(query.to_string(), "IAM-20680");

        let query = Query::parse(Some("\tSN74 HC595\n")).unwrap();
        assert_eq!(query.as_str(), "SN74 HC595");
    }

    #[test]
    fn test_parse_rejects_missing_and_blank() {
        assert!(matches!(Query::parse(None), Err(PipelineError::BadInput)));
        assert!(matches!(Query::parse(Some("")), Err(PipelineError::BadInput)));
        assert!(matches!(Query::parse(Some(" \t")), Err(PipelineError::BadInput)));
    }

    #[test]
    fn test_parse_keeps_special_characters() {
        let query = Query::parse(Some("A&B #1/2")).unwrap();
        assert_eq!(query.as_str(), "A&B #1/2");
    }
}
