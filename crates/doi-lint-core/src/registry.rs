//! Crossref works lookup.
//!
//! Only the fields the comparator needs are modelled; everything else in
//! the `message` object is ignored. Lookups are advisory: any failure is
//! logged and reported as "no metadata".

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::CheckResult;
use crate::http;

/// Envelope returned by `GET /works/<doi>`.
///
/// `message` stays raw so an absent, `null` or `{}` message can be told
/// apart from a record that merely lacks the compared fields.
#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    message: Option<Map<String, Value>>,
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The per-work metadata Crossref reports for a DOI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkMetadata {
    /// Work title; Crossref sends a list, older records a bare string.
    #[serde(default)]
    pub title: Option<Title>,
    /// Contributors in byline order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Vec<Author>,
    /// Print publication date.
    #[serde(default)]
    pub published_print: Option<PartialDate>,
    /// Online publication date.
    #[serde(default)]
    pub published_online: Option<PartialDate>,
}

impl WorkMetadata {
    /// The publication year, preferring the print date over the online date.
    ///
    /// The online date is also used when a print date exists but carries no year.
    pub fn year(&self) -> Option<i64> {
        self.published_print
            .as_ref()
            .and_then(PartialDate::year)
            .or_else(|| self.published_online.as_ref().and_then(PartialDate::year))
    }

    /// Non-empty family names, in byline order.
    pub fn family_names(&self) -> impl Iterator<Item = &str> {
        self.author
            .iter()
            .filter_map(|author| author.family.as_deref())
            .filter(|family| !family.trim().is_empty())
    }
}

/// A title as either a single string or a list of alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Title {
    /// A single title string.
    Single(String),
    /// Title variants; the first one is the primary title.
    List(Vec<String>),
}

impl Title {
    /// The primary title, if any.
    pub fn primary(&self) -> Option<&str> {
        match self {
            Self::Single(title) => Some(title),
            Self::List(titles) => titles.first().map(String::as_str),
        }
    }
}

/// One contributor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Given name(s).
    #[serde(default)]
    pub given: Option<String>,
    /// Family name.
    #[serde(default)]
    pub family: Option<String>,
}

/// A Crossref partial date: `{"date-parts": [[year, month, day]]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PartialDate {
    /// Date parts; unknown components are `null`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_parts: Vec<Vec<Option<i64>>>,
}

impl PartialDate {
    /// The year of the first date, if present.
    pub fn year(&self) -> Option<i64> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

/// Client for the Crossref works API.
#[derive(Debug, Clone)]
pub struct Registry {
    client: Client,
    base_url: String,
}

impl Registry {
    /// Create a registry client rooted at `base_url` (without `/works`).
    pub fn new(client: Client, base_url: &str) -> CheckResult<Self> {
        Ok(Self {
            client,
            base_url: http::base_url("registry", base_url)?,
        })
    }

    /// The lookup URL for a DOI.
    pub fn url_for(&self, doi: &str) -> String {
        format!("{}/works/{doi}", self.base_url)
    }

    /// Fetch metadata for `doi`.
    ///
    /// Returns `None` on transport failure, non-200 status, an unparseable
    /// body, or a `message` that is absent, `null` or `{}`. A non-empty
    /// message without any compared field is still metadata.
    #[instrument(skip(self))]
    pub fn fetch(&self, doi: &str) -> Option<WorkMetadata> {
        let url = self.url_for(doi);
        let response = match self.client.get(&url).send() {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %http::describe(&err), "registry request failed");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            debug!(status = response.status().as_u16(), "registry lookup unsuccessful");
            return None;
        }

        let message = match response.json::<WorksResponse>() {
            Ok(body) => body.message.filter(|message| !message.is_empty())?,
            Err(err) => {
                debug!(error = %err, "registry body is not usable JSON");
                return None;
            }
        };

        match serde_json::from_value(Value::Object(message)) {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                debug!(error = %err, "registry message has unexpected field types");
                None
            }
        }
    }
}
