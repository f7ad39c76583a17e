//! `issue-bridge github` commands.

use std::io::Write;

use super::emit;
use crate::config::Settings;
use crate::context::TrackerContext;
use crate::ports::{list_all, CallGuard, IssueFilter};
use crate::reconcile::UNASSIGNED;

/// Execute `github list`: print the open issues of the configured project,
/// skipping pull requests.
///
/// # Errors
///
/// Returns an error string if the project is invalid, the upstream tracker
/// is unavailable, or a page request fails.
pub async fn list(
    settings: &Settings,
    ctx: &TrackerContext,
    guard: &CallGuard,
    filter: &IssueFilter,
    out: &mut dyn Write,
) -> Result<(), String> {
    let project = settings.upstream_project().map_err(|e| e.to_string())?;
    let issues = list_all(ctx.upstream()?, &project, filter, guard)
        .await
        .map_err(|e| format!("failed to list issues of {project}: {e}"))?;
    for issue in issues.iter().filter(|i| !i.is_pull_request) {
        emit(
            out,
            &format!(
                "{project}#{} [{}] {}\n\tAssignee: {}\n\t{}\n",
                issue.number,
                issue.state,
                issue.title,
                issue.assignee.as_deref().unwrap_or(UNASSIGNED),
                issue.html_url,
            ),
        )?;
    }
    Ok(())
}
