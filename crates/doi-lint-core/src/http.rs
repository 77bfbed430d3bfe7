//! Shared blocking HTTP client.

use std::error::Error as _;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{CheckError, CheckResult};

/// Build the client used for every resolver and registry request.
///
/// Redirects are followed (reqwest's default policy), so a resolver hit is
/// judged by the status of the final landing page.
pub fn build_client(user_agent: &str, timeout: Duration) -> CheckResult<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(CheckError::HttpClient)
}

/// Validate a configured base URL and strip any trailing slash.
pub(crate) fn base_url(name: &'static str, url: &str) -> CheckResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(CheckError::InvalidBaseUrl {
            name,
            url: url.to_string(),
        })
    }
}

/// Render a transport error with its full source chain.
///
/// reqwest's top-level message is generic ("error sending request for
/// url"); the useful part (DNS failure, refused connection, timeout) sits
/// further down the chain.
pub(crate) fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
