//! `issue-bridge jira` commands.

use std::io::Write;

use super::emit;
use crate::config::Settings;
use crate::context::TrackerContext;
use crate::ports::{search_all, CallGuard};
use crate::reconcile::{DEFAULT_PAGE_SIZE, UNASSIGNED};

/// Execute `jira list`: print the open issues matching the configured
/// project and `query`.
///
/// # Errors
///
/// Returns an error string if neither a project nor a query is available,
/// the downstream tracker is unavailable, or the search fails.
pub async fn list(
    settings: &Settings,
    ctx: &TrackerContext,
    guard: &CallGuard,
    query: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), String> {
    let jql = settings.list_query(query).map_err(|e| e.to_string())?;
    let issues = search_all(ctx.downstream()?, &jql, DEFAULT_PAGE_SIZE, guard)
        .await
        .map_err(|e| format!("jira search failed: {e}"))?;
    for issue in &issues {
        emit(
            out,
            &format!(
                "{}: {} -> {}\n\tAssignee: {}\n",
                issue.key,
                issue.summary,
                issue.status,
                issue.assignee.as_deref().unwrap_or(UNASSIGNED),
            ),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryDownstream, InMemoryUpstream};
    use crate::ports::DownstreamIssue;

    #[tokio::test]
    async fn prints_key_summary_status_and_assignee() {
        let downstream = InMemoryDownstream::new(vec![
            DownstreamIssue {
                id: "1".into(),
                key: "OPECO-1".into(),
                summary: "Port widgets".into(),
                status: "In Progress".into(),
                assignee: Some("Jane Doe".into()),
            },
            DownstreamIssue {
                id: "2".into(),
                key: "OPECO-2".into(),
                summary: "Drop gadgets".into(),
                status: "New".into(),
                assignee: None,
            },
        ]);
        let ctx = TrackerContext::new(Box::new(downstream), Box::new(InMemoryUpstream::new()));

        let mut out = Vec::new();
        list(&Settings::default(), &ctx, &CallGuard::default(), None, &mut out).await.unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "OPECO-1: Port widgets -> In Progress\n\tAssignee: Jane Doe\n\
             OPECO-2: Drop gadgets -> New\n\tAssignee: unassigned\n"
        );
    }

    #[tokio::test]
    async fn requires_project_or_query() {
        let ctx = TrackerContext::new(
            Box::new(InMemoryDownstream::new(vec![])),
            Box::new(InMemoryUpstream::new()),
        );
        let settings = Settings { jira_project: String::new(), ..Settings::default() };
        let mut out = Vec::new();
        let err = list(&settings, &ctx, &CallGuard::default(), None, &mut out).await.unwrap_err();
        assert!(err.contains("either a jira project or a query"));
    }
}
