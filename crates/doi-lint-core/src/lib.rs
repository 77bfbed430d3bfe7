//! Core library for doi-lint.
//!
//! Checks that the `book` and `article` entries of a BibTeX bibliography
//! carry a DOI, that the DOI resolves, and that the entry agrees with the
//! metadata Crossref holds for it.
//!
//! # Modules
//!
//! - [`bibtex`] - Entry extraction
//! - [`doi`] - DOI extraction from field values
//! - [`resolver`] - DOI resolution over HTTP
//! - [`registry`] - Crossref metadata lookup
//! - [`compare`] - Fuzzy metadata comparison
//! - [`check`] - The per-entry pipeline and run reports
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use doi_lint_core::{Checker, ConfigLoader, RunReport, Silent};
//!
//! let (config, _sources) = ConfigLoader::new()
//!     .with_project_search(Utf8Path::new("."))
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let checker = Checker::from_config(&config).expect("Failed to build HTTP client");
//! let source = std::fs::read_to_string("refs.bib").expect("Failed to read refs.bib");
//!
//! let mut run = RunReport::new();
//! run.record(checker.check_source(Utf8Path::new("refs.bib"), &source, &mut Silent));
//! println!("checked {} entries, {} errors", run.checked, run.errors.len());
//! ```
#![deny(unsafe_code)]

pub mod bibtex;
pub mod check;
pub mod compare;
pub mod config;
pub mod doi;
pub mod error;
pub mod http;
pub mod registry;
pub mod resolver;

/// Default upper bound on a bibliography file's size (5 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 5 * 1024 * 1024;

pub use bibtex::{Entry, ParsedBibliography, SkippedFragment, parse_bibliography};
pub use check::{
    CheckEvent, CheckObserver, Checker, EntryOutcome, EntryReport, FileReport, MetadataStatus,
    RunReport, Silent, require_doi,
};
pub use compare::{MetadataWarning, TITLE_OVERLAP_MIN, compare_metadata};
pub use config::{Config, ConfigLoader, ConfigSources, LogLevel};
pub use error::{CheckError, CheckResult, ConfigError, ConfigResult};
pub use registry::{Registry, WorkMetadata};
pub use resolver::{Resolution, Resolver};
