//! Live adapter for the `DownstreamTracker` port using the Jira REST API v2.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{http_client, parse_base_url, send, send_json};
use crate::ports::{
    CreatedIssue, DownstreamIssue, DownstreamTracker, NewIssue, PortError, RemoteLink, SearchPage,
    TrackerFuture,
};

/// Jira instance used when none is configured.
pub const DEFAULT_JIRA_BASE_URL: &str = "https://issues.redhat.com/";

const SEARCH_FIELDS: &str = "summary,status,assignee";

/// Connection settings for a Jira instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraClientConfig {
    /// Base URL of the Jira instance.
    pub base_url: String,
    /// Personal access token, sent as a bearer token.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Web URL of an issue, e.g. `https://issues.redhat.com/browse/OPECO-1`.
#[must_use]
pub fn browse_url(base_url: &str, key: &str) -> String {
    format!("{}/browse/{key}", base_url.trim_end_matches('/'))
}

/// Jira-backed downstream tracker.
#[derive(Debug)]
pub struct LiveDownstream {
    client: Client,
    base_url: Url,
    token: String,
}

impl LiveDownstream {
    /// Creates a client after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty, the base URL does not parse,
    /// or the HTTP client cannot be built.
    pub fn new(config: &JiraClientConfig) -> Result<Self, String> {
        if config.token.trim().is_empty() {
            return Err("cannot access jira without a token".to_string());
        }
        let base_url = parse_base_url(&config.base_url)?;
        Ok(Self { client: http_client(config.timeout)?, base_url, token: config.token.clone() })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PortError> {
        self.base_url
            .join(path)
            .map_err(|e| -> PortError { format!("invalid jira endpoint {path:?}: {e}").into() })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    start_at: usize,
    total: usize,
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    fields: JiraFields,
}

#[derive(Deserialize)]
struct JiraFields {
    #[serde(default)]
    summary: String,
    status: Option<Named>,
    assignee: Option<JiraUser>,
}

#[derive(Deserialize, Serialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraUser {
    display_name: String,
}

#[derive(Deserialize, Serialize)]
struct RemoteLinkEnvelope {
    object: RemoteObject,
}

#[derive(Deserialize, Serialize)]
struct RemoteObject {
    url: String,
    #[serde(default)]
    title: String,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    fields: CreateFields<'a>,
}

#[derive(Serialize)]
struct CreateFields<'a> {
    project: ProjectKey<'a>,
    summary: &'a str,
    description: &'a str,
    issuetype: Named,
}

#[derive(Serialize)]
struct ProjectKey<'a> {
    key: &'a str,
}

#[derive(Deserialize)]
struct CreateResponse {
    id: String,
    key: String,
}

impl From<JiraIssue> for DownstreamIssue {
    fn from(issue: JiraIssue) -> Self {
        Self {
            id: issue.id,
            key: issue.key,
            summary: issue.fields.summary,
            status: issue.fields.status.map(|s| s.name).unwrap_or_default(),
            assignee: issue.fields.assignee.map(|a| a.display_name),
        }
    }
}

impl DownstreamTracker for LiveDownstream {
    fn search_page(
        &self,
        query: &str,
        start_at: usize,
        max_results: usize,
    ) -> TrackerFuture<'_, SearchPage> {
        let query = query.to_string();
        Box::pin(async move {
            let url = self.endpoint("rest/api/2/search")?;
            let start_at = start_at.to_string();
            let max_results = max_results.to_string();
            let request = self.client.get(url).bearer_auth(&self.token).query(&[
                ("jql", query.as_str()),
                ("startAt", start_at.as_str()),
                ("maxResults", max_results.as_str()),
                ("fields", SEARCH_FIELDS),
            ]);
            let response: SearchResponse = send_json(request, "jira search").await?;
            Ok(SearchPage {
                issues: response.issues.into_iter().map(DownstreamIssue::from).collect(),
                start_at: response.start_at,
                total: response.total,
            })
        })
    }

    fn get_issue(&self, key: &str) -> TrackerFuture<'_, DownstreamIssue> {
        let key = key.to_string();
        Box::pin(async move {
            let url = self.endpoint(&format!("rest/api/2/issue/{key}"))?;
            let request =
                self.client.get(url).bearer_auth(&self.token).query(&[("fields", SEARCH_FIELDS)]);
            let issue: JiraIssue = send_json(request, &format!("jira issue {key}")).await?;
            Ok(issue.into())
        })
    }

    fn remote_links(&self, key: &str) -> TrackerFuture<'_, Vec<RemoteLink>> {
        let key = key.to_string();
        Box::pin(async move {
            let url = self.endpoint(&format!("rest/api/2/issue/{key}/remotelink"))?;
            let request = self.client.get(url).bearer_auth(&self.token);
            let links: Vec<RemoteLinkEnvelope> =
                send_json(request, &format!("jira remote links of {key}")).await?;
            Ok(links
                .into_iter()
                .map(|l| RemoteLink { url: l.object.url, title: l.object.title })
                .collect())
        })
    }

    fn create_issue(&self, issue: &NewIssue) -> TrackerFuture<'_, CreatedIssue> {
        let issue = issue.clone();
        Box::pin(async move {
            let url = self.endpoint("rest/api/2/issue")?;
            let body = CreateRequest {
                fields: CreateFields {
                    project: ProjectKey { key: &issue.project },
                    summary: &issue.summary,
                    description: &issue.description,
                    issuetype: Named { name: issue.issue_type.clone() },
                },
            };
            let request = self.client.post(url).bearer_auth(&self.token).json(&body);
            let created: CreateResponse = send_json(request, "jira issue creation").await?;
            Ok(CreatedIssue { id: created.id, key: created.key })
        })
    }

    fn create_remote_link(&self, issue: &str, link: &RemoteLink) -> TrackerFuture<'_, ()> {
        let issue = issue.to_string();
        let body = RemoteLinkEnvelope {
            object: RemoteObject { url: link.url.clone(), title: link.title.clone() },
        };
        Box::pin(async move {
            let url = self.endpoint(&format!("rest/api/2/issue/{issue}/remotelink"))?;
            let request = self.client.post(url).bearer_auth(&self.token).json(&body);
            send(request, &format!("jira remote link creation on {issue}")).await?;
            Ok(())
        })
    }
}
