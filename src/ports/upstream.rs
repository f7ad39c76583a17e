//! Upstream tracker port (the tracker work items originate in).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CallError, CallGuard, TrackerFuture};

/// An `owner/repo` project qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Owning user or organisation.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl ProjectRef {
    /// Creates a project reference from its two parts.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self { owner: owner.into(), repo: repo.into() }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for ProjectRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self::new(owner, repo))
            }
            _ => Err(format!("invalid project {s:?}: expected owner/repo")),
        }
    }
}

/// An issue in the upstream tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamIssue {
    /// Issue number within its project.
    pub number: u64,
    /// Lifecycle state label (e.g. `open`, `closed`).
    pub state: String,
    /// Login of the assignee, `None` when unassigned.
    pub assignee: Option<String>,
    /// Issue title.
    pub title: String,
    /// Issue body, empty when absent.
    pub body: String,
    /// Browser URL of the issue.
    pub html_url: String,
    /// Whether this entry is a pull request rather than an issue.
    #[serde(default)]
    pub is_pull_request: bool,
}

/// Filters applied when listing upstream issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    /// Milestone number.
    pub milestone: Option<String>,
    /// Assignee login.
    pub assignee: Option<String>,
    /// Labels that must all be present.
    pub labels: Vec<String>,
}

/// One page of an upstream issue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePage {
    /// Issues on this page.
    pub issues: Vec<UpstreamIssue>,
    /// Page to request next, `None` on the last page.
    pub next_page: Option<u32>,
}

/// Reads issues from the upstream tracker.
pub trait UpstreamTracker: Send + Sync {
    /// Fetches a single issue by project and number.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue does not exist or cannot be fetched.
    fn get_issue(&self, project: &ProjectRef, number: u64) -> TrackerFuture<'_, UpstreamIssue>;

    /// Fetches one page of open issues matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing request fails.
    fn list_page(
        &self,
        project: &ProjectRef,
        filter: &IssueFilter,
        page: u32,
    ) -> TrackerFuture<'_, IssuePage>;
}

/// Lists every open issue matching `filter`, following next-page indicators.
///
/// # Errors
///
/// Returns the first failed page request.
pub async fn list_all(
    tracker: &dyn UpstreamTracker,
    project: &ProjectRef,
    filter: &IssueFilter,
    guard: &CallGuard,
) -> Result<Vec<UpstreamIssue>, CallError> {
    let mut issues = Vec::new();
    let mut page = 1;
    loop {
        let listing = guard.run(tracker.list_page(project, filter, page)).await?;
        debug!(%project, page, returned = listing.issues.len(), "fetched issue page");
        issues.extend(listing.issues);
        match listing.next_page {
            Some(next) if next > page => page = next,
            _ => break,
        }
    }
    Ok(issues)
}
