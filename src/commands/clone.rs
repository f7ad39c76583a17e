//! `issue-bridge clone` command.

use std::io::Write;

use super::emit;
use crate::adapters::live::browse_url;
use crate::clone::Cloner;
use crate::config::{ConfigError, Settings};
use crate::context::TrackerContext;
use crate::ports::CallGuard;

const DRY_RUN_BANNER: &str = "############# DRY RUN MODE #############";

/// Execute the `clone` command.
///
/// Issues are cloned in order; the first failure stops the run.
///
/// # Errors
///
/// Returns an error string if the projects are not configured, a tracker is
/// unavailable, or a clone fails.
pub async fn run(
    settings: &Settings,
    ctx: &TrackerContext,
    guard: &CallGuard,
    issues: &[u64],
    dry_run: bool,
    out: &mut dyn Write,
) -> Result<(), String> {
    let project = settings.upstream_project().map_err(|e| e.to_string())?;
    let jira_project = settings.jira_project.trim();
    if jira_project.is_empty() {
        return Err(ConfigError::MissingJiraProject.to_string());
    }
    let cloner = Cloner::new(ctx.downstream()?, ctx.upstream()?, guard.clone());

    for &number in issues {
        let outcome = cloner
            .clone_issue(&project, number, jira_project, dry_run)
            .await
            .map_err(|e| e.to_string())?;
        match outcome.created {
            None => emit(
                out,
                &format!("\n{DRY_RUN_BANNER}\n{}\n{DRY_RUN_BANNER}\n", outcome.plan.render()),
            )?,
            Some(created) => emit(
                out,
                &format!(
                    "Issue #{number} cloned; see {}\n",
                    browse_url(&settings.jira_base_url, &created.key)
                ),
            )?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryDownstream, InMemoryUpstream};
    use crate::ports::{ProjectRef, UpstreamIssue};

    fn issue(number: u64) -> UpstreamIssue {
        UpstreamIssue {
            number,
            state: "open".into(),
            assignee: None,
            title: format!("Issue {number}"),
            body: "- [ ] #3 follow-up".into(),
            html_url: format!("https://github.com/acme/widgets/issues/{number}"),
            is_pull_request: false,
        }
    }

    fn settings() -> Settings {
        Settings {
            github_project: "acme/widgets".into(),
            jira_project: "OPECO".into(),
            ..Settings::default()
        }
    }

    fn context() -> TrackerContext {
        let project = ProjectRef::new("acme", "widgets");
        let upstream =
            InMemoryUpstream::new().with_issue(&project, issue(1)).with_issue(&project, issue(2));
        TrackerContext::new(Box::new(InMemoryDownstream::new(vec![])), Box::new(upstream))
    }

    #[tokio::test]
    async fn clones_each_issue_and_prints_browse_urls() {
        let mut out = Vec::new();
        run(&settings(), &context(), &CallGuard::default(), &[1, 2], false, &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Issue #1 cloned; see https://issues.redhat.com/browse/OPECO-1\n\
             Issue #2 cloned; see https://issues.redhat.com/browse/OPECO-2\n"
        );
    }

    #[tokio::test]
    async fn dry_run_prints_plan() {
        let mut out = Vec::new();
        run(&settings(), &context(), &CallGuard::default(), &[1], true, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(DRY_RUN_BANNER));
        assert!(text.contains("Summary: [UPSTREAM] Issue 1 #1"));
        assert!(text
            .contains(" * [acme/widgets#3|https://github.com/acme/widgets/issues/3] follow-up"));
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let mut out = Vec::new();
        let err = run(&settings(), &context(), &CallGuard::default(), &[1, 99, 2], false, &mut out)
            .await
            .unwrap_err();
        assert!(err.contains("acme/widgets#99"));
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn empty_jira_project_is_rejected() {
        let settings = Settings { jira_project: String::new(), ..settings() };
        let mut out = Vec::new();
        let err = run(&settings, &context(), &CallGuard::default(), &[1], true, &mut out)
            .await
            .unwrap_err();
        assert!(err.contains("jira project"));
    }
}
