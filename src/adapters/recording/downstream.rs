//! Recording adapter for the `DownstreamTracker` port.

use serde_json::json;

use super::{recorded, SharedRecorder};
use crate::ports::{
    CreatedIssue, DownstreamIssue, DownstreamTracker, NewIssue, RemoteLink, SearchPage,
    TrackerFuture,
};

const PORT: &str = "downstream";

/// Records downstream interactions while delegating to an inner tracker.
pub struct RecordingDownstream {
    inner: Box<dyn DownstreamTracker>,
    recorder: SharedRecorder,
}

impl RecordingDownstream {
    /// Creates a recording tracker wrapping `inner`.
    pub fn new(inner: Box<dyn DownstreamTracker>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl DownstreamTracker for RecordingDownstream {
    fn search_page(
        &self,
        query: &str,
        start_at: usize,
        max_results: usize,
    ) -> TrackerFuture<'_, SearchPage> {
        let input = json!({ "query": query, "start_at": start_at, "max_results": max_results });
        let call = self.inner.search_page(query, start_at, max_results);
        recorded(&self.recorder, PORT, "search_page", &input, call)
    }

    fn get_issue(&self, key: &str) -> TrackerFuture<'_, DownstreamIssue> {
        let call = self.inner.get_issue(key);
        recorded(&self.recorder, PORT, "get_issue", &json!({ "key": key }), call)
    }

    fn remote_links(&self, key: &str) -> TrackerFuture<'_, Vec<RemoteLink>> {
        let call = self.inner.remote_links(key);
        recorded(&self.recorder, PORT, "remote_links", &json!({ "key": key }), call)
    }

    fn create_issue(&self, issue: &NewIssue) -> TrackerFuture<'_, CreatedIssue> {
        let call = self.inner.create_issue(issue);
        recorded(&self.recorder, PORT, "create_issue", issue, call)
    }

    fn create_remote_link(&self, issue: &str, link: &RemoteLink) -> TrackerFuture<'_, ()> {
        let input = json!({ "issue": issue, "url": link.url, "title": link.title });
        let call = self.inner.create_remote_link(issue, link);
        recorded(&self.recorder, PORT, "create_remote_link", &input, call)
    }
}
