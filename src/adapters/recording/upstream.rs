//! Recording adapter for the `UpstreamTracker` port.

use serde_json::json;

use super::{recorded, SharedRecorder};
use crate::ports::{
    IssueFilter, IssuePage, ProjectRef, TrackerFuture, UpstreamIssue, UpstreamTracker,
};

const PORT: &str = "upstream";

/// Records upstream interactions while delegating to an inner tracker.
pub struct RecordingUpstream {
    inner: Box<dyn UpstreamTracker>,
    recorder: SharedRecorder,
}

impl RecordingUpstream {
    /// Creates a recording tracker wrapping `inner`.
    pub fn new(inner: Box<dyn UpstreamTracker>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl UpstreamTracker for RecordingUpstream {
    fn get_issue(&self, project: &ProjectRef, number: u64) -> TrackerFuture<'_, UpstreamIssue> {
        let input = json!({ "project": project.to_string(), "number": number });
        let call = self.inner.get_issue(project, number);
        recorded(&self.recorder, PORT, "get_issue", &input, call)
    }

    fn list_page(
        &self,
        project: &ProjectRef,
        filter: &IssueFilter,
        page: u32,
    ) -> TrackerFuture<'_, IssuePage> {
        let input = json!({ "project": project.to_string(), "filter": filter, "page": page });
        let call = self.inner.list_page(project, filter, page);
        recorded(&self.recorder, PORT, "list_page", &input, call)
    }
}
