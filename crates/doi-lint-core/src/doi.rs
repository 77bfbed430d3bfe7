//! DOI extraction.

use std::sync::LazyLock;

use regex::Regex;

/// A DOI: `10.<registrant>/<suffix>`, suffix up to the next whitespace.
static DOI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"10\.\d+/[^\s]+").expect("valid regex"));

/// Extract the bare DOI from a raw field value.
///
/// Accepts plain identifiers as well as resolver URLs such as
/// `https://doi.org/10.1000/xyz` or `http://dx.doi.org/10.1000/xyz`.
/// Returns `None` when nothing DOI-shaped is present.
pub fn extract_doi(raw: &str) -> Option<&str> {
    DOI_PATTERN.find(raw.trim()).map(|m| m.as_str())
}
