//! Staged export file naming.

use chrono::{DateTime, TimeZone};

use crate::config::EXPORT_EXTENSION;

/// Timestamp layout embedded in staged file names (second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Stem used when a query sanitizes down to nothing.
const FALLBACK_STEM: &str = "query";

/// Builds `{query}_{yyyyMMddHHmmss}.csv` for a query and instant.
///
/// Two runs for the same query within the same second produce the same name;
/// the later write replaces the earlier file.
#[must_use]
pub fn staged_file_name<Tz>(query: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let stem = sanitize_filename_component(query);
    let stem = if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    };
    format!("{stem}_{}.{EXPORT_EXTENSION}", at.format(TIMESTAMP_FORMAT))
}

/// Name of the hidden sibling a staged file is written to before the rename.
#[must_use]
pub fn partial_file_name(file_name: &str) -> String {
    format!(".{file_name}.part")
}

/// Replaces characters that are unsafe in file names and collapses runs of them.
///
/// Path separators, reserved punctuation, whitespace and control characters
/// become `_`; leading `_`/`.` and trailing `_` are trimmed so a query can
/// never name a hidden file or walk out of the staging directory.
pub(crate) fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\'' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    out.trim_start_matches(['_', '.'])
        .trim_end_matches('_')
        .to_string()
}
