//! Error types for doi-lint-core.

use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A source could not be read or does not fit [`Config`](crate::Config).
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that prevent a check run from starting.
///
/// Per-entry problems (missing DOI, unresolvable DOI, unreachable
/// registry) never surface through this type; they are recorded in the
/// run report instead.
#[derive(Error, Debug)]
pub enum CheckError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// A configured base URL is unusable.
    #[error("invalid {name} URL: {url}")]
    InvalidBaseUrl {
        /// Which endpoint (`resolver` or `registry`).
        name: &'static str,
        /// The rejected value.
        url: String,
    },
}

/// Result type alias using [`CheckError`].
pub type CheckResult<T> = Result<T, CheckError>;
