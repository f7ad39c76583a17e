//! In-memory tracker adapters.
//!
//! Used by tests and for offline runs. Both trackers count the requests they
//! serve so callers can assert on pagination and fetch behaviour.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::ports::{
    CreatedIssue, DownstreamIssue, DownstreamTracker, IssueFilter, IssuePage, NewIssue,
    PortError, ProjectRef, RemoteLink, SearchPage, TrackerFuture, UpstreamIssue, UpstreamTracker,
};

/// Downstream tracker backed by a fixed list of issues.
#[derive(Debug, Default)]
pub struct InMemoryDownstream {
    issues: Vec<DownstreamIssue>,
    links: HashMap<String, Vec<RemoteLink>>,
    failing_links: HashSet<String>,
    slow_links: HashMap<String, Duration>,
    server_page_limit: Option<usize>,
    search_requests: AtomicUsize,
    created: Mutex<Vec<NewIssue>>,
    created_links: Mutex<Vec<(String, RemoteLink)>>,
}

impl InMemoryDownstream {
    /// Creates a tracker serving `issues` in the given order.
    #[must_use]
    pub fn new(issues: Vec<DownstreamIssue>) -> Self {
        Self { issues, ..Self::default() }
    }

    /// Attaches remote links to the issue with `key`.
    #[must_use]
    pub fn with_links(mut self, key: &str, links: Vec<RemoteLink>) -> Self {
        self.links.insert(key.to_string(), links);
        self
    }

    /// Makes remote-link lookups for `key` fail.
    #[must_use]
    pub fn with_failing_links(mut self, key: &str) -> Self {
        self.failing_links.insert(key.to_string());
        self
    }

    /// Delays remote-link lookups for `key` by `delay`.
    #[must_use]
    pub fn with_slow_links(mut self, key: &str, delay: Duration) -> Self {
        self.slow_links.insert(key.to_string(), delay);
        self
    }

    /// Caps every search page at `limit` issues regardless of what was requested.
    #[must_use]
    pub fn with_server_page_limit(mut self, limit: usize) -> Self {
        self.server_page_limit = Some(limit);
        self
    }

    /// Number of search pages served so far.
    pub fn search_requests(&self) -> usize {
        self.search_requests.load(Ordering::SeqCst)
    }

    /// Issues created through this tracker, in creation order.
    pub fn created_issues(&self) -> Vec<NewIssue> {
        self.created.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Remote links created through this tracker, keyed by issue id.
    pub fn created_links(&self) -> Vec<(String, RemoteLink)> {
        self.created_links.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl DownstreamTracker for InMemoryDownstream {
    fn search_page(
        &self,
        _query: &str,
        start_at: usize,
        max_results: usize,
    ) -> TrackerFuture<'_, SearchPage> {
        self.search_requests.fetch_add(1, Ordering::SeqCst);
        let size = self.server_page_limit.map_or(max_results, |limit| limit.min(max_results));
        let start = start_at.min(self.issues.len());
        let end = (start + size).min(self.issues.len());
        let page = SearchPage {
            issues: self.issues[start..end].to_vec(),
            start_at: start,
            total: self.issues.len(),
        };
        Box::pin(async move { Ok(page) })
    }

    fn get_issue(&self, key: &str) -> TrackerFuture<'_, DownstreamIssue> {
        let found = self.issues.iter().find(|i| i.key == key).cloned();
        let result: Result<DownstreamIssue, PortError> =
            found.ok_or_else(|| format!("issue {key} does not exist").into());
        Box::pin(async move { result })
    }

    fn remote_links(&self, key: &str) -> TrackerFuture<'_, Vec<RemoteLink>> {
        let result: Result<Vec<RemoteLink>, PortError> = if self.failing_links.contains(key) {
            Err(format!("remote links for {key} unavailable").into())
        } else {
            Ok(self.links.get(key).cloned().unwrap_or_default())
        };
        let delay = self.slow_links.get(key).copied();
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn create_issue(&self, issue: &NewIssue) -> TrackerFuture<'_, CreatedIssue> {
        let mut created = self.created.lock().unwrap_or_else(PoisonError::into_inner);
        created.push(issue.clone());
        let n = self.issues.len() + created.len();
        let result =
            CreatedIssue { id: format!("{}", 10_000 + n), key: format!("{}-{n}", issue.project) };
        Box::pin(async move { Ok(result) })
    }

    fn create_remote_link(&self, issue: &str, link: &RemoteLink) -> TrackerFuture<'_, ()> {
        self.created_links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((issue.to_string(), link.clone()));
        Box::pin(async { Ok(()) })
    }
}

/// Upstream tracker backed by a map of issues per project.
///
/// Listing ignores the filter; only pagination is modelled.
#[derive(Debug)]
pub struct InMemoryUpstream {
    issues: BTreeMap<(String, u64), UpstreamIssue>,
    page_size: usize,
    fetch_delay: Option<Duration>,
    get_requests: AtomicUsize,
    list_requests: AtomicUsize,
}

impl Default for InMemoryUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUpstream {
    /// Creates an empty tracker listing 50 issues per page.
    #[must_use]
    pub fn new() -> Self {
        Self {
            issues: BTreeMap::new(),
            page_size: 50,
            fetch_delay: None,
            get_requests: AtomicUsize::new(0),
            list_requests: AtomicUsize::new(0),
        }
    }

    /// Sets the number of issues per listing page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delays every single-issue fetch by `delay`.
    #[must_use]
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Adds or replaces an issue.
    pub fn insert(&mut self, project: &ProjectRef, issue: UpstreamIssue) {
        self.issues.insert((project.to_string(), issue.number), issue);
    }

    /// Builder form of [`InMemoryUpstream::insert`].
    #[must_use]
    pub fn with_issue(mut self, project: &ProjectRef, issue: UpstreamIssue) -> Self {
        self.insert(project, issue);
        self
    }

    /// Number of single-issue fetches served so far.
    pub fn get_requests(&self) -> usize {
        self.get_requests.load(Ordering::SeqCst)
    }

    /// Number of listing pages served so far.
    pub fn list_requests(&self) -> usize {
        self.list_requests.load(Ordering::SeqCst)
    }
}

impl UpstreamTracker for InMemoryUpstream {
    fn get_issue(&self, project: &ProjectRef, number: u64) -> TrackerFuture<'_, UpstreamIssue> {
        self.get_requests.fetch_add(1, Ordering::SeqCst);
        let result: Result<UpstreamIssue, PortError> = self
            .issues
            .get(&(project.to_string(), number))
            .cloned()
            .ok_or_else(|| format!("404 Not Found: {project}#{number}").into());
        let delay = self.fetch_delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn list_page(
        &self,
        project: &ProjectRef,
        _filter: &IssueFilter,
        page: u32,
    ) -> TrackerFuture<'_, IssuePage> {
        self.list_requests.fetch_add(1, Ordering::SeqCst);
        let key = project.to_string();
        let all: Vec<UpstreamIssue> = self
            .issues
            .iter()
            .filter(|((p, _), issue)| *p == key && issue.state == "open")
            .map(|(_, issue)| issue.clone())
            .collect();
        let skip = (page.max(1) as usize - 1) * self.page_size;
        let issues: Vec<UpstreamIssue> =
            all.iter().skip(skip).take(self.page_size).cloned().collect();
        let next_page = (skip + self.page_size < all.len()).then_some(page + 1);
        Box::pin(async move { Ok(IssuePage { issues, next_page }) })
    }
}
