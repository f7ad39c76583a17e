//! Replaying adapter for the `UpstreamTracker` port.

use serde_json::json;

use super::{next_output, replay_result, SharedReplayer};
use crate::ports::{
    IssueFilter, IssuePage, ProjectRef, TrackerFuture, UpstreamIssue, UpstreamTracker,
};

const PORT: &str = "upstream";

/// Serves recorded upstream responses from a cassette.
pub struct ReplayingUpstream {
    replayer: SharedReplayer,
}

impl ReplayingUpstream {
    /// Create a replaying tracker backed by the given replayer.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }
}

impl UpstreamTracker for ReplayingUpstream {
    fn get_issue(&self, project: &ProjectRef, number: u64) -> TrackerFuture<'_, UpstreamIssue> {
        let input = json!({ "project": project.to_string(), "number": number });
        let output = next_output(&self.replayer, PORT, "get_issue", &input);
        Box::pin(async move { replay_result(output) })
    }

    fn list_page(
        &self,
        project: &ProjectRef,
        filter: &IssueFilter,
        page: u32,
    ) -> TrackerFuture<'_, IssuePage> {
        let input = json!({ "project": project.to_string(), "filter": filter, "page": page });
        let output = next_output(&self.replayer, PORT, "list_page", &input);
        Box::pin(async move { replay_result(output) })
    }
}
