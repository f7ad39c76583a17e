//! Replaying adapter for the `DownstreamTracker` port.

use serde_json::{json, Value};

use super::{next_output, replay_result, SharedReplayer};
use crate::ports::{
    CreatedIssue, DownstreamIssue, DownstreamTracker, NewIssue, RemoteLink, SearchPage,
    TrackerFuture,
};

const PORT: &str = "downstream";

/// Serves recorded downstream responses from a cassette.
pub struct ReplayingDownstream {
    replayer: SharedReplayer,
}

impl ReplayingDownstream {
    /// Create a replaying tracker backed by the given replayer.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }
}

impl DownstreamTracker for ReplayingDownstream {
    fn search_page(
        &self,
        query: &str,
        start_at: usize,
        max_results: usize,
    ) -> TrackerFuture<'_, SearchPage> {
        let input = json!({ "query": query, "start_at": start_at, "max_results": max_results });
        let output = next_output(&self.replayer, PORT, "search_page", &input);
        Box::pin(async move { replay_result(output) })
    }

    fn get_issue(&self, key: &str) -> TrackerFuture<'_, DownstreamIssue> {
        let output = next_output(&self.replayer, PORT, "get_issue", &json!({ "key": key }));
        Box::pin(async move { replay_result(output) })
    }

    fn remote_links(&self, key: &str) -> TrackerFuture<'_, Vec<RemoteLink>> {
        let output = next_output(&self.replayer, PORT, "remote_links", &json!({ "key": key }));
        Box::pin(async move { replay_result(output) })
    }

    fn create_issue(&self, issue: &NewIssue) -> TrackerFuture<'_, CreatedIssue> {
        let input = serde_json::to_value(issue).unwrap_or(Value::Null);
        let output = next_output(&self.replayer, PORT, "create_issue", &input);
        Box::pin(async move { replay_result(output) })
    }

    fn create_remote_link(&self, issue: &str, link: &RemoteLink) -> TrackerFuture<'_, ()> {
        let input = json!({ "issue": issue, "url": link.url, "title": link.title });
        let output = next_output(&self.replayer, PORT, "create_remote_link", &input);
        Box::pin(async move { replay_result(output) })
    }
}
