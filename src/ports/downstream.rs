//! Downstream tracker port (the tracker linked copies are created in).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CallError, CallGuard, TrackerFuture};

/// An issue in the downstream tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownstreamIssue {
    /// Tracker-assigned internal id.
    pub id: String,
    /// Tracker-assigned key (e.g. `OPECO-42`).
    pub key: String,
    /// One-line summary.
    pub summary: String,
    /// Lifecycle state label.
    pub status: String,
    /// Display name of the assignee, `None` when unassigned.
    pub assignee: Option<String>,
}

/// A reference from a downstream issue to an external resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLink {
    /// Target URL.
    pub url: String,
    /// Display title.
    pub title: String,
}

/// One page of a downstream search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Issues on this page, in server order.
    pub issues: Vec<DownstreamIssue>,
    /// Offset of the first issue on this page.
    pub start_at: usize,
    /// Server-reported total number of matching issues.
    pub total: usize,
}

/// Fields for a downstream issue to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    /// Downstream project key.
    pub project: String,
    /// One-line summary.
    pub summary: String,
    /// Issue description body.
    pub description: String,
    /// Issue type name (e.g. `Story`).
    pub issue_type: String,
}

/// Identity of a freshly created downstream issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    /// Tracker-assigned internal id.
    pub id: String,
    /// Tracker-assigned key.
    pub key: String,
}

/// Reads and writes issues in the downstream tracker.
pub trait DownstreamTracker: Send + Sync {
    /// Fetches one page of issues matching `query`, starting at `start_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the search request fails.
    fn search_page(
        &self,
        query: &str,
        start_at: usize,
        max_results: usize,
    ) -> TrackerFuture<'_, SearchPage>;

    /// Fetches a single issue by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be fetched.
    fn get_issue(&self, key: &str) -> TrackerFuture<'_, DownstreamIssue>;

    /// Fetches the remote links attached to an issue, in tracker order.
    ///
    /// # Errors
    ///
    /// Returns an error if the links cannot be fetched.
    fn remote_links(&self, key: &str) -> TrackerFuture<'_, Vec<RemoteLink>>;

    /// Creates a new issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker rejects the issue.
    fn create_issue(&self, issue: &NewIssue) -> TrackerFuture<'_, CreatedIssue>;

    /// Attaches a remote link to the issue with the given id or key.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be created.
    fn create_remote_link(&self, issue: &str, link: &RemoteLink) -> TrackerFuture<'_, ()>;
}

/// Runs a paginated search until the server-reported total is reached.
///
/// Each request starts where the previous page ended (`start_at + returned`),
/// so servers that return fewer issues than requested are still drained.
/// An empty page ends the loop even if the total was not reached.
///
/// # Errors
///
/// Returns the first failed page request.
pub async fn search_all(
    tracker: &dyn DownstreamTracker,
    query: &str,
    page_size: usize,
    guard: &CallGuard,
) -> Result<Vec<DownstreamIssue>, CallError> {
    let mut issues = Vec::new();
    let mut start_at = 0;
    loop {
        let page = guard.run(tracker.search_page(query, start_at, page_size)).await?;
        let returned = page.issues.len();
        debug!(start_at = page.start_at, returned, total = page.total, "fetched search page");
        issues.extend(page.issues);
        start_at = page.start_at + returned;
        if returned == 0 || start_at >= page.total {
            break;
        }
    }
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryDownstream;

    fn issues(count: usize) -> Vec<DownstreamIssue> {
        (0..count)
            .map(|i| DownstreamIssue {
                id: format!("{}", 1000 + i),
                key: format!("OPECO-{i}"),
                summary: format!("issue {i}"),
                status: "To Do".to_string(),
                assignee: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn drains_all_pages_in_order() {
        let tracker = InMemoryDownstream::new(issues(125));
        let found = search_all(&tracker, "project=OPECO", 50, &CallGuard::default()).await.unwrap();

        assert_eq!(found.len(), 125);
        assert_eq!(tracker.search_requests(), 3);
        assert_eq!(found[0].key, "OPECO-0");
        assert_eq!(found[124].key, "OPECO-124");
    }

    #[tokio::test]
    async fn keeps_paging_when_server_caps_page_size() {
        let tracker = InMemoryDownstream::new(issues(125)).with_server_page_limit(20);
        let found =
            search_all(&tracker, "project=OPECO", 1000, &CallGuard::default()).await.unwrap();

        assert_eq!(found.len(), 125);
        assert_eq!(tracker.search_requests(), 7);
    }

    #[tokio::test]
    async fn empty_result_takes_one_request() {
        let tracker = InMemoryDownstream::new(Vec::new());
        let found = search_all(&tracker, "project=OPECO", 50, &CallGuard::default()).await.unwrap();

        assert!(found.is_empty());
        assert_eq!(tracker.search_requests(), 1);
    }
}
