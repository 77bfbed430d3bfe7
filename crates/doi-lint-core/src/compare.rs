//! Fuzzy comparison of a BibTeX entry against registry metadata.
//!
//! Each field is compared independently and only when both sides have it.
//! Mismatches are advisory: they produce [`MetadataWarning`]s, never errors.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::bibtex::Entry;
use crate::registry::{Title, WorkMetadata};

/// Minimum share of the shorter title's words that must appear in the other title.
pub const TITLE_OVERLAP_MIN: f64 = 0.5;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A disagreement between the local entry and the registry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum MetadataWarning {
    /// The titles share too few words.
    Title {
        /// Title as written in the bibliography.
        local: String,
        /// Registry title.
        registry: String,
    },
    /// No registry family name occurs in the local author list.
    Author {
        /// Author field as written in the bibliography.
        local: String,
    },
    /// The publication years differ.
    Year {
        /// Year as written in the bibliography (trimmed).
        local: String,
        /// Registry year.
        registry: String,
    },
}

impl fmt::Display for MetadataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title { local, registry } => {
                write!(f, "Title mismatch: BibTeX='{local}' vs DOI='{registry}'")
            }
            Self::Author { local } => write!(f, "Author mismatch: BibTeX='{local}' vs DOI authors"),
            Self::Year { local, registry } => {
                write!(f, "Year mismatch: BibTeX='{local}' vs DOI='{registry}'")
            }
        }
    }
}

/// Normalize text for fuzzy comparison.
///
/// Lowercases, drops everything that is neither a word character nor
/// whitespace, collapses whitespace runs to one space, and trims.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = NON_WORD.replace_all(&lower, "");
    WHITESPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}

/// Share of the smaller word set found in the larger one.
///
/// Returns `None` when either title has no words.
pub fn title_overlap(a: &str, b: &str) -> Option<f64> {
    let a_norm = normalize(a);
    let b_norm = normalize(b);
    let a_words: HashSet<&str> = a_norm.split(' ').filter(|w| !w.is_empty()).collect();
    let b_words: HashSet<&str> = b_norm.split(' ').filter(|w| !w.is_empty()).collect();

    let total = a_words.len().min(b_words.len());
    if total == 0 {
        return None;
    }
    let overlap = a_words.intersection(&b_words).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = overlap as f64 / total as f64;
    Some(ratio)
}

/// Compare the entry's title with the registry title.
pub fn compare_title(entry: &Entry, title: Option<&Title>) -> Option<MetadataWarning> {
    let local = entry.field("title")?;
    let registry = title?.primary()?;
    let overlap = title_overlap(local, registry)?;
    (overlap < TITLE_OVERLAP_MIN).then(|| MetadataWarning::Title {
        local: local.to_string(),
        registry: registry.to_string(),
    })
}

/// Compare the entry's authors with the registry family names.
///
/// A single family name found anywhere in the normalized author field is
/// enough to pass.
pub fn compare_author(entry: &Entry, metadata: &WorkMetadata) -> Option<MetadataWarning> {
    let local = entry.field("author")?;
    let local_norm = normalize(local);

    let families: Vec<String> = metadata
        .family_names()
        .map(normalize)
        .filter(|family| !family.is_empty())
        .collect();
    if families.is_empty() {
        return None;
    }

    let matched = families.iter().any(|family| local_norm.contains(family.as_str()));
    (!matched).then(|| MetadataWarning::Author {
        local: local.to_string(),
    })
}

/// Compare the entry's year with the registry publication year.
pub fn compare_year(entry: &Entry, metadata: &WorkMetadata) -> Option<MetadataWarning> {
    let local = entry.field("year")?.trim();
    let registry = metadata.year()?.to_string();
    (local != registry).then(|| MetadataWarning::Year {
        local: local.to_string(),
        registry,
    })
}

/// Run every field comparison, in title, author, year order.
#[tracing::instrument(skip_all, fields(key = %entry.key))]
pub fn compare_metadata(entry: &Entry, metadata: &WorkMetadata) -> Vec<MetadataWarning> {
    let warnings: Vec<_> = [
        compare_title(entry, metadata.title.as_ref()),
        compare_author(entry, metadata),
        compare_year(entry, metadata),
    ]
    .into_iter()
    .flatten()
    .collect();
    tracing::debug!(warnings = warnings.len(), "compared metadata");
    warnings
}
