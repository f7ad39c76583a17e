//! Live adapters that talk to the real trackers over HTTP.

pub mod github;
pub mod jira;

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::ports::PortError;

pub use github::{GithubClientConfig, LiveUpstream};
pub use jira::{browse_url, JiraClientConfig, LiveDownstream};

/// Sends a request and decodes a JSON body, turning non-2xx statuses into errors.
async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    what: &str,
) -> Result<T, PortError> {
    let response = send(request, what).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| -> PortError { format!("failed to parse {what} response: {e}").into() })
}

/// Sends a request, turning transport failures and non-2xx statuses into errors.
async fn send(request: RequestBuilder, what: &str) -> Result<Response, PortError> {
    let response = request
        .send()
        .await
        .map_err(|e| -> PortError { format!("{what} request failed: {e}").into() })?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        Err(format!("{what} failed ({status})").into())
    } else {
        Err(format!("{what} failed ({status}): {body}").into())
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("issue-bridge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))
}

/// Parses `raw` as an absolute http(s) URL, normalised to end with `/`.
fn parse_base_url(raw: &str) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(raw).map_err(|e| format!("invalid base URL {raw:?}: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("invalid base URL {raw:?}: scheme must be http or https"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
