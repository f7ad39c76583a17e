//! Live adapter for the `UpstreamTracker` port using the GitHub REST API.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use reqwest::{Client, Url};
use serde::Deserialize;

use super::{http_client, parse_base_url, send};
use crate::ports::{
    IssueFilter, IssuePage, PortError, ProjectRef, TrackerFuture, UpstreamIssue, UpstreamTracker,
};

/// GitHub REST API root used when none is configured.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com/";

/// Issues requested per listing page.
pub const LIST_PAGE_SIZE: u32 = 50;

/// Matches the `page` parameter of the `rel="next"` entry in a `Link` header.
static NEXT_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[^>]*[?&]page=(\d+)[^>]*>\s*;\s*rel="next""#)
        .unwrap_or_else(|_| unreachable!("static regex pattern"))
});

/// Connection settings for the GitHub API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubClientConfig {
    /// Root of the REST API.
    pub api_url: String,
    /// Personal access token.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// GitHub-backed upstream tracker.
#[derive(Debug)]
pub struct LiveUpstream {
    client: Client,
    api_url: Url,
    token: String,
}

impl LiveUpstream {
    /// Creates a client after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty, the API URL does not parse,
    /// or the HTTP client cannot be built.
    pub fn new(config: &GithubClientConfig) -> Result<Self, String> {
        if config.token.trim().is_empty() {
            return Err("cannot access github without a token".to_string());
        }
        let api_url = parse_base_url(&config.api_url)?;
        Ok(Self { client: http_client(config.timeout)?, api_url, token: config.token.clone() })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PortError> {
        self.api_url
            .join(path)
            .map_err(|e| -> PortError { format!("invalid github endpoint {path:?}: {e}").into() })
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
    }
}

#[derive(Deserialize)]
struct GithubIssue {
    number: u64,
    state: String,
    #[serde(default)]
    title: String,
    body: Option<String>,
    #[serde(default)]
    html_url: String,
    assignee: Option<GithubUser>,
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GithubUser {
    login: String,
}

impl From<GithubIssue> for UpstreamIssue {
    fn from(issue: GithubIssue) -> Self {
        Self {
            number: issue.number,
            state: issue.state,
            assignee: issue.assignee.map(|a| a.login),
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            html_url: issue.html_url,
            is_pull_request: issue.pull_request.is_some(),
        }
    }
}

/// Reads the next page number from a response's `Link` header.
fn next_page(headers: &HeaderMap) -> Option<u32> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| NEXT_PAGE_RE.captures(value))
        .and_then(|caps| caps[1].parse().ok())
}

fn list_query(filter: &IssueFilter, page: u32) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("state", "open".to_string()),
        ("per_page", LIST_PAGE_SIZE.to_string()),
        ("page", page.to_string()),
    ];
    if let Some(milestone) = &filter.milestone {
        query.push(("milestone", milestone.clone()));
    }
    if let Some(assignee) = &filter.assignee {
        query.push(("assignee", assignee.clone()));
    }
    if !filter.labels.is_empty() {
        query.push(("labels", filter.labels.join(",")));
    }
    query
}

impl UpstreamTracker for LiveUpstream {
    fn get_issue(&self, project: &ProjectRef, number: u64) -> TrackerFuture<'_, UpstreamIssue> {
        let path = format!("repos/{}/{}/issues/{number}", project.owner, project.repo);
        let what = format!("github issue {project}#{number}");
        Box::pin(async move {
            let response = send(self.get(self.endpoint(&path)?), &what).await?;
            let issue: GithubIssue = response
                .json()
                .await
                .map_err(|e| -> PortError {
                    format!("failed to parse {what} response: {e}").into()
                })?;
            Ok(issue.into())
        })
    }

    fn list_page(
        &self,
        project: &ProjectRef,
        filter: &IssueFilter,
        page: u32,
    ) -> TrackerFuture<'_, IssuePage> {
        let path = format!("repos/{}/{}/issues", project.owner, project.repo);
        let query = list_query(filter, page);
        let what = format!("github issue listing for {project}");
        Box::pin(async move {
            let request = self.get(self.endpoint(&path)?).query(&query);
            let response = send(request, &what).await?;
            let next_page = next_page(response.headers());
            let issues: Vec<GithubIssue> = response
                .json()
                .await
                .map_err(|e| -> PortError {
                    format!("failed to parse {what} response: {e}").into()
                })?;
            let issues = issues.into_iter().map(UpstreamIssue::from).collect();
            Ok(IssuePage { issues, next_page })
        })
    }
}
