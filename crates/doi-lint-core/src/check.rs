//! Per-entry check pipeline and run reports.
//!
//! For every `book` or `article` entry the [`Checker`] runs, in order:
//! DOI presence, DOI resolution, and (optionally) a metadata comparison
//! against the registry. The first failing stage ends that entry; the run
//! always continues with the next entry.
//!
//! Progress is streamed to a [`CheckObserver`] as typed [`CheckEvent`]s so
//! the caller decides how (or whether) to render it. The final outcome is
//! collected in [`FileReport`]s and a [`RunReport`].

use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::bibtex::{Entry, SkippedFragment, parse_bibliography};
use crate::compare::{MetadataWarning, compare_metadata};
use crate::config::Config;
use crate::error::CheckResult;
use crate::http::build_client;
use crate::registry::Registry;
use crate::resolver::{Resolution, Resolver};

/// Entry types that must carry a resolvable DOI.
pub const CHECKED_TYPES: &[&str] = &["book", "article"];

/// Whether entries of this (lowercase) type are checked.
pub fn is_checked_type(entry_type: &str) -> bool {
    CHECKED_TYPES.contains(&entry_type)
}

/// Require a `doi` field on the entry.
///
/// Only presence is checked; an empty value passes here and fails later
/// as an invalid DOI.
pub fn require_doi(entry: &Entry) -> Result<&str, String> {
    entry.field("doi").ok_or_else(|| {
        format!(
            "Entry '{}' ({}) is missing DOI field",
            entry.key, entry.entry_type
        )
    })
}

/// Progress notifications emitted while checking.
#[derive(Debug, Clone, Copy)]
pub enum CheckEvent<'a> {
    /// A file is about to be parsed.
    FileStarted {
        /// The file being checked.
        path: &'a Utf8Path,
    },
    /// An `@type{` opener did not yield an entry.
    FragmentSkipped {
        /// The offending fragment.
        fragment: &'a SkippedFragment,
    },
    /// A book or article entry is about to be checked.
    EntryStarted {
        /// The entry.
        entry: &'a Entry,
    },
    /// The entry has no `doi` field.
    DoiMissing {
        /// The recorded error.
        message: &'a str,
    },
    /// The entry has a `doi` field.
    DoiFound {
        /// The raw field value.
        doi: &'a str,
    },
    /// The DOI resolved.
    Resolved {
        /// Final HTTP status.
        status: u16,
    },
    /// The DOI did not resolve.
    ResolveFailed {
        /// The recorded error, prefixed with the entry key.
        message: &'a str,
    },
    /// A registry lookup is starting.
    FetchingMetadata,
    /// One field disagrees with the registry.
    MetadataWarning {
        /// The disagreement.
        warning: &'a MetadataWarning,
    },
    /// Every compared field agrees with the registry.
    MetadataConsistent,
    /// The registry returned nothing usable.
    MetadataUnavailable,
}

/// Receives [`CheckEvent`]s as the pipeline runs.
pub trait CheckObserver {
    /// Handle one event.
    fn on_event(&mut self, event: CheckEvent<'_>);
}

/// An observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl CheckObserver for Silent {
    fn on_event(&mut self, _event: CheckEvent<'_>) {}
}

/// Terminal state of one checked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOutcome {
    /// DOI present and resolvable.
    Passed,
    /// No `doi` field.
    MissingDoi,
    /// The DOI was malformed or did not resolve.
    Unresolved,
}

/// What happened with the registry comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataStatus {
    /// Not attempted (earlier failure or verification disabled).
    NotChecked,
    /// Attempted, but no metadata came back.
    Unavailable,
    /// Metadata fetched and compared.
    Compared,
}

/// Result of checking one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    /// Citation key.
    pub key: String,
    /// Entry type.
    pub entry_type: String,
    /// Line of the opening `@`.
    pub line: usize,
    /// Raw `doi` field value, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// How the entry ended.
    pub outcome: EntryOutcome,
    /// Error message for failed entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Registry comparison status.
    pub metadata: MetadataStatus,
    /// Advisory metadata warnings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<MetadataWarning>,
}

impl EntryReport {
    fn new(entry: &Entry) -> Self {
        Self {
            key: entry.key.clone(),
            entry_type: entry.entry_type.clone(),
            line: entry.line,
            doi: None,
            outcome: EntryOutcome::Passed,
            error: None,
            metadata: MetadataStatus::NotChecked,
            warnings: Vec::new(),
        }
    }

    fn fail(mut self, outcome: EntryOutcome, message: String) -> Self {
        self.outcome = outcome;
        self.error = Some(message);
        self
    }
}

/// Result of checking one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// The checked file.
    pub path: Utf8PathBuf,
    /// One report per book/article entry, in file order.
    pub entries: Vec<EntryReport>,
    /// Openers that did not parse as entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedFragment>,
}

impl FileReport {
    /// Error messages of the failed entries, in file order.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| entry.error.as_deref())
    }
}

/// Totals across every checked file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Per-file reports, in argument order.
    pub files: Vec<FileReport>,
    /// Number of book/article entries checked.
    pub checked: usize,
    /// Every error message, in the order encountered.
    pub errors: Vec<String>,
}

impl RunReport {
    /// Start an empty run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file's results into the totals.
    pub fn record(&mut self, file: FileReport) {
        self.checked += file.entries.len();
        self.errors.extend(file.errors().map(str::to_string));
        self.files.push(file);
    }

    /// `true` when no entry failed.
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the check pipeline.
#[derive(Debug, Clone)]
pub struct Checker {
    resolver: Resolver,
    registry: Registry,
    verify_metadata: bool,
    request_delay: Duration,
}

impl Checker {
    /// Build a checker from its parts.
    pub const fn new(resolver: Resolver, registry: Registry) -> Self {
        Self {
            resolver,
            registry,
            verify_metadata: true,
            request_delay: Duration::ZERO,
        }
    }

    /// Build a checker (and its shared HTTP client) from configuration.
    pub fn from_config(config: &Config) -> CheckResult<Self> {
        let client = build_client(&config.user_agent, Duration::from_secs(config.timeout_secs))?;
        let resolver = Resolver::new(client.clone(), &config.resolver_url)?;
        let registry = Registry::new(client, &config.registry_url)?;
        Ok(Self::new(resolver, registry)
            .with_verify_metadata(config.verify_metadata)
            .with_request_delay(Duration::from_millis(config.request_delay_ms)))
    }

    /// Enable or disable the registry comparison stage.
    pub const fn with_verify_metadata(mut self, verify: bool) -> Self {
        self.verify_metadata = verify;
        self
    }

    /// Pause after every registry lookup.
    pub const fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Parse and check one bibliography.
    #[instrument(skip(self, content, observer), fields(bytes = content.len()))]
    pub fn check_source(
        &self,
        path: &Utf8Path,
        content: &str,
        observer: &mut dyn CheckObserver,
    ) -> FileReport {
        observer.on_event(CheckEvent::FileStarted { path });

        let parsed = parse_bibliography(content);
        for fragment in &parsed.skipped {
            observer.on_event(CheckEvent::FragmentSkipped { fragment });
        }

        let entries: Vec<EntryReport> = parsed
            .entries
            .iter()
            .filter(|entry| is_checked_type(&entry.entry_type))
            .map(|entry| self.check_entry(entry, observer))
            .collect();

        info!(
            checked = entries.len(),
            total = parsed.entries.len(),
            skipped = parsed.skipped.len(),
            "file checked"
        );

        FileReport {
            path: path.to_path_buf(),
            entries,
            skipped: parsed.skipped,
        }
    }

    /// Run every stage for one entry, stopping at the first failure.
    #[instrument(skip(self, entry, observer), fields(key = %entry.key, line = entry.line))]
    pub fn check_entry(&self, entry: &Entry, observer: &mut dyn CheckObserver) -> EntryReport {
        observer.on_event(CheckEvent::EntryStarted { entry });
        let mut report = EntryReport::new(entry);

        let raw = match require_doi(entry) {
            Ok(raw) => raw,
            Err(message) => {
                debug!("missing DOI");
                observer.on_event(CheckEvent::DoiMissing { message: &message });
                return report.fail(EntryOutcome::MissingDoi, message);
            }
        };
        report.doi = Some(raw.to_string());
        observer.on_event(CheckEvent::DoiFound { doi: raw });

        let resolution = self.resolver.resolve(raw);
        let doi = match (&resolution, resolution.failure()) {
            (Resolution::Resolved { doi, status }, _) => {
                observer.on_event(CheckEvent::Resolved { status: *status });
                doi
            }
            (_, failure) => {
                let message = format!(
                    "Entry '{}': {}",
                    entry.key,
                    failure.unwrap_or_default()
                );
                debug!(%message, "DOI did not resolve");
                observer.on_event(CheckEvent::ResolveFailed { message: &message });
                return report.fail(EntryOutcome::Unresolved, message);
            }
        };

        if self.verify_metadata {
            observer.on_event(CheckEvent::FetchingMetadata);
            match self.registry.fetch(doi) {
                Some(metadata) => {
                    let warnings = compare_metadata(entry, &metadata);
                    if warnings.is_empty() {
                        observer.on_event(CheckEvent::MetadataConsistent);
                    }
                    for warning in &warnings {
                        observer.on_event(CheckEvent::MetadataWarning { warning });
                    }
                    report.metadata = MetadataStatus::Compared;
                    report.warnings = warnings;
                }
                None => {
                    observer.on_event(CheckEvent::MetadataUnavailable);
                    report.metadata = MetadataStatus::Unavailable;
                }
            }
            if !self.request_delay.is_zero() {
                thread::sleep(self.request_delay);
            }
        }

        report
    }
}
