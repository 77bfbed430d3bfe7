//! Best-effort BibTeX entry extraction.
//!
//! Entries are recognized by the `@type{key, field = {value}, ...}` shape:
//! the entry body may hold brace groups one level deep, which is where the
//! brace-delimited field values live. A brace nested inside a value closes
//! the value early. Anything that does not fully match is not an entry; instead of
//! vanishing silently, stray `@type{` openers are reported as
//! [`SkippedFragment`]s so callers can surface them.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One complete `@type{key, ...}` record.
static ENTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)@(\w+)\{([^,]+),\s*((?:[^{}]|\{[^}]*\})*)\}").expect("valid regex")
});

/// A `name = {value}` field inside an entry body.
static FIELD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*=\s*\{([^}]*)\}").expect("valid regex"));

/// Anything that looks like the start of an entry.
static OPENER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\w+)\s*\{").expect("valid regex"));

/// Entry types that carry no bibliographic record and are never reported as skipped.
const NON_RECORD_TYPES: &[&str] = &["comment", "string", "preamble"];

/// Maximum characters of a skipped fragment echoed back in diagnostics.
const SNIPPET_CHARS: usize = 60;

/// A single bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Lowercased entry type (`article`, `book`, `misc`, ...).
    pub entry_type: String,
    /// Citation key, trimmed.
    pub key: String,
    /// Lowercased field name to trimmed raw value.
    pub fields: HashMap<String, String>,
    /// 1-based line of the opening `@`.
    pub line: usize,
}

impl Entry {
    /// Look up a field by its (lowercase) name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// An `@type{` opener that did not produce an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFragment {
    /// 1-based line of the opener.
    pub line: usize,
    /// The start of the fragment, truncated for display.
    pub snippet: String,
}

/// Everything extracted from one bibliography file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBibliography {
    /// Fully matched entries, in file order.
    pub entries: Vec<Entry>,
    /// Openers that were not part of any matched entry.
    pub skipped: Vec<SkippedFragment>,
}

/// Extract entries from BibTeX source text.
///
/// Never fails: malformed input yields fewer entries and more skipped
/// fragments.
#[tracing::instrument(skip_all, fields(bytes = content.len()))]
pub fn parse_bibliography(content: &str) -> ParsedBibliography {
    let mut parsed = ParsedBibliography::default();
    let mut spans = Vec::new();
    let mut lines = LineCounter::new(content);

    for caps in ENTRY_PATTERN.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        spans.push(whole.range());

        let fields = FIELD_PATTERN
            .captures_iter(&caps[3])
            .map(|field| (field[1].to_lowercase(), field[2].trim().to_string()))
            .collect();

        parsed.entries.push(Entry {
            entry_type: caps[1].to_lowercase(),
            key: caps[2].trim().to_string(),
            fields,
            line: lines.line_at(whole.start()),
        });
    }

    let mut lines = LineCounter::new(content);
    for caps in OPENER_PATTERN.captures_iter(content) {
        let Some(opener) = caps.get(0) else { continue };
        let start = opener.start();
        if spans.iter().any(|span| span.contains(&start)) {
            continue;
        }
        if NON_RECORD_TYPES.contains(&caps[1].to_lowercase().as_str()) {
            continue;
        }
        parsed.skipped.push(SkippedFragment {
            line: lines.line_at(start),
            snippet: snippet_at(content, start),
        });
    }

    tracing::debug!(
        entries = parsed.entries.len(),
        skipped = parsed.skipped.len(),
        "parsed bibliography"
    );
    parsed
}

/// Maps byte offsets to 1-based line numbers for offsets visited in
/// ascending order, scanning each byte once.
struct LineCounter<'a> {
    content: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    const fn new(content: &'a str) -> Self {
        Self {
            content,
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        debug_assert!(offset >= self.offset, "offsets must not go backwards");
        self.line += self.content.as_bytes()[self.offset..offset]
            .iter()
            .filter(|&&byte| byte == b'\n')
            .count();
        self.offset = offset;
        self.line
    }
}

fn snippet_at(content: &str, offset: usize) -> String {
    let rest = content[offset..].lines().next().unwrap_or_default().trim_end();
    let mut snippet: String = rest.chars().take(SNIPPET_CHARS).collect();
    if rest.chars().count() > SNIPPET_CHARS {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_entry() {
        let parsed = parse_bibliography(
            "@article{smith2020,\n  title = {Deep Learning},\n  year = {2020},\n  doi = {10.1234/abc}\n}\n",
        );
        assert_eq!(parsed.entries.len(), 1);
        let entry = &parsed.entries[0];
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.key, "smith2020");
        assert_eq!(entry.field("title"), Some("Deep Learning"));
        assert_eq!(entry.field("year"), Some("2020"));
        assert_eq!(entry.field("doi"), Some("10.1234/abc"));
        assert_eq!(entry.fields.len(), 3);
        assert_eq!(entry.line, 1);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn lowercases_type_and_field_names() {
        let parsed = parse_bibliography("@ARTICLE{Key1, TITLE = {Hello}, DOI = {10.1/x}}");
        let entry = &parsed.entries[0];
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.key, "Key1");
        assert_eq!(entry.field("title"), Some("Hello"));
        assert_eq!(entry.field("doi"), Some("10.1/x"));
    }

    #[test]
    fn trims_keys_and_values() {
        let parsed = parse_bibliography("@book{  spaced  ,\n  title = {   Padded Title   }\n}");
        let entry = &parsed.entries[0];
        assert_eq!(entry.key, "spaced");
        assert_eq!(entry.field("title"), Some("Padded Title"));
    }

    #[test]
    fn inner_braces_truncate_the_entry() {
        let parsed = parse_bibliography(
            "@article{nested,\n  title = {The {GPU} Revolution},\n  year = {2021}\n}",
        );
        assert_eq!(parsed.entries.len(), 1);
        let entry = &parsed.entries[0];
        assert_eq!(entry.field("title"), Some("The {GPU"));
        assert_eq!(entry.field("year"), None);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn parses_multiple_entries_with_line_numbers() {
        let text = "% header comment\n\
                    @article{a, title = {First}}\n\
                    \n\
                    @book{b,\n  title = {Second}\n}\n\
                    @misc{c, note = {Third}}\n";
        let parsed = parse_bibliography(text);
        let keys: Vec<_> = parsed.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        let lines: Vec<_> = parsed.entries.iter().map(|e| e.line).collect();
        assert_eq!(lines, [2, 4, 7]);
        assert_eq!(parsed.entries[2].entry_type, "misc");
    }

    #[test]
    fn line_numbers_stay_correct_across_entries_and_fragments() {
        let mut text = String::new();
        let mut expected_entries = Vec::new();
        let mut expected_skipped = Vec::new();
        let mut line = 1;
        for i in 0..50 {
            text.push_str("% filler\n\n");
            line += 2;
            expected_entries.push(line);
            text.push_str(&format!("@book{{k{i},\n  title = {{T{i}}}\n}}\n"));
            line += 3;
            if i % 7 == 0 {
                expected_skipped.push(line);
                text.push_str("@misc {spaced, note = {x}}\n");
                line += 1;
            }
        }

        let parsed = parse_bibliography(&text);
        let entry_lines: Vec<_> = parsed.entries.iter().map(|e| e.line).collect();
        let skipped_lines: Vec<_> = parsed.skipped.iter().map(|s| s.line).collect();
        assert_eq!(entry_lines, expected_entries);
        assert_eq!(skipped_lines, expected_skipped);
    }

    #[test]
    fn quoted_values_are_not_fields() {
        let parsed = parse_bibliography("@article{q, title = \"Quoted\", year = {1999}}");
        let entry = &parsed.entries[0];
        assert_eq!(entry.field("title"), None);
        assert_eq!(entry.field("year"), Some("1999"));
    }

    #[test]
    fn empty_input_yields_nothing() {
        let parsed = parse_bibliography("");
        assert!(parsed.entries.is_empty());
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn unterminated_entry_is_reported_as_skipped() {
        let text = "@article{good, title = {Fine}}\n@article{broken, title = {Never closed}\n";
        let parsed = parse_bibliography(text);
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].key, "good");
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 2);
        assert!(parsed.skipped[0].snippet.starts_with("@article{broken"));
    }

    #[test]
    fn entry_without_key_separator_is_skipped() {
        let parsed = parse_bibliography("@article{nokey}");
        assert!(parsed.entries.is_empty());
        assert_eq!(parsed.skipped.len(), 1);
    }

    #[test]
    fn comment_and_string_blocks_are_not_reported() {
        let text = "@comment{jabref-meta: databaseType:bibtex;}\n\
                    @string{acm = {ACM}}\n\
                    @preamble{ {\\newcommand} }\n";
        let parsed = parse_bibliography(text);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn at_sign_inside_field_is_not_an_opener() {
        let parsed =
            parse_bibliography("@article{mail, note = {contact @example{x} for data}, year = {2020}}");
        assert_eq!(parsed.entries.len(), 1);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn long_snippet_is_truncated() {
        let text = format!("@article{{{}", "x".repeat(200));
        let parsed = parse_bibliography(&text);
        assert_eq!(parsed.skipped.len(), 1);
        assert!(parsed.skipped[0].snippet.ends_with("..."));
        assert_eq!(parsed.skipped[0].snippet.chars().count(), SNIPPET_CHARS + 3);
    }
}
