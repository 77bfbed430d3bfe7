//! DOI resolution against the public resolver.
//!
//! A DOI passes when `GET <resolver>/<doi>` (following redirects) ends in
//! HTTP 200. Every failure mode is folded into a [`Resolution`] value at
//! the call site; nothing here returns an error.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::doi::extract_doi;
use crate::error::CheckResult;
use crate::http;

/// Outcome of resolving one DOI field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// The resolver answered 200.
    Resolved {
        /// The extracted identifier.
        doi: String,
        /// Final HTTP status (always 200).
        status: u16,
    },
    /// The field value contains no `10.<digits>/...` identifier.
    ///
    /// No request is made in this case.
    InvalidFormat {
        /// The field value as written.
        raw: String,
    },
    /// The resolver answered with a 4xx or 5xx status.
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase.
        reason: String,
    },
    /// The resolver answered with some other non-200 status.
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
    },
    /// The request never produced a response (DNS, refused, timeout, ...).
    Transport {
        /// Rendered error chain.
        reason: String,
    },
}

impl Resolution {
    /// `true` only for [`Resolution::Resolved`].
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// The failure message, or `None` when the DOI resolved.
    pub fn failure(&self) -> Option<String> {
        match self {
            Self::Resolved { .. } => None,
            Self::InvalidFormat { raw } => Some(format!("Invalid DOI format: {raw}")),
            Self::HttpError { status, reason } => Some(format!("HTTP error {status}: {reason}")),
            Self::UnexpectedStatus { status } => Some(format!("DOI URL returned status {status}")),
            Self::Transport { reason } => Some(format!("URL error: {reason}")),
        }
    }
}

/// Client for the DOI resolver.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
    base_url: String,
}

impl Resolver {
    /// Create a resolver that issues requests against `base_url`.
    pub fn new(client: Client, base_url: &str) -> CheckResult<Self> {
        Ok(Self {
            client,
            base_url: http::base_url("resolver", base_url)?,
        })
    }

    /// The request URL for an extracted DOI.
    pub fn url_for(&self, doi: &str) -> String {
        format!("{}/{doi}", self.base_url)
    }

    /// Resolve a raw DOI field value.
    ///
    /// Makes at most one request; there are no retries.
    #[instrument(skip(self))]
    pub fn resolve(&self, raw: &str) -> Resolution {
        let Some(doi) = extract_doi(raw) else {
            debug!("field value is not a DOI, skipping request");
            return Resolution::InvalidFormat {
                raw: raw.trim().to_string(),
            };
        };

        let url = self.url_for(doi);
        debug!(%url, "resolving DOI");
        let response = match self.client.get(&url).send() {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "resolver request failed");
                return Resolution::Transport {
                    reason: http::describe(&err),
                };
            }
        };

        let status = response.status();
        debug!(status = status.as_u16(), final_url = %response.url(), "resolver answered");
        classify(doi, status)
    }
}

fn classify(doi: &str, status: StatusCode) -> Resolution {
    if status == StatusCode::OK {
        Resolution::Resolved {
            doi: doi.to_string(),
            status: status.as_u16(),
        }
    } else if status.is_client_error() || status.is_server_error() {
        Resolution::HttpError {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    } else {
        Resolution::UnexpectedStatus {
            status: status.as_u16(),
        }
    }
}
