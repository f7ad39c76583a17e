//! Cloning upstream issues into the downstream tracker.
//!
//! A clone is a downstream story whose summary names the upstream issue,
//! plus a remote link back to it. The link has exactly the shape the
//! [`LinkResolver`](crate::linkage::LinkResolver) recognises, so cloned
//! issues take part in later reconciliation runs.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::info;

use crate::linkage::UpstreamRef;
use crate::ports::{
    CallError, CallGuard, CreatedIssue, DownstreamTracker, NewIssue, ProjectRef, RemoteLink,
    UpstreamIssue, UpstreamTracker,
};

/// Issue type of every clone.
pub const CLONE_ISSUE_TYPE: &str = "Story";

/// Task-list entry referencing another issue: `- [ ] #123 trailing text`.
static TASK_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- \[ \] #([0-9]+)(.*)$").unwrap_or_else(|_| unreachable!("static regex pattern"))
});

/// Failure while cloning one upstream issue.
#[derive(Debug, Error)]
pub enum CloneError {
    /// The upstream issue could not be fetched.
    #[error("failed to fetch upstream issue {reference}: {source}")]
    Fetch {
        /// Issue being cloned.
        reference: UpstreamRef,
        /// Why the fetch failed.
        #[source]
        source: CallError,
    },
    /// The downstream tracker rejected the new issue.
    #[error("failed to create downstream issue for {reference}: {source}")]
    Create {
        /// Issue being cloned.
        reference: UpstreamRef,
        /// Why creation failed.
        #[source]
        source: CallError,
    },
    /// The issue was created but the link back to upstream was not.
    #[error("created {key} but failed to link it to {reference}: {source}")]
    Link {
        /// Key of the created issue.
        key: String,
        /// Issue being cloned.
        reference: UpstreamRef,
        /// Why linking failed.
        #[source]
        source: CallError,
    },
    /// The run was cancelled.
    #[error("clone cancelled")]
    Cancelled,
}

impl CloneError {
    fn from_call(err: CallError, wrap: impl FnOnce(CallError) -> Self) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            wrap(err)
        }
    }
}

/// Everything that would be written for one clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonePlan {
    /// The upstream issue being cloned.
    pub reference: UpstreamRef,
    /// The downstream issue to create.
    pub issue: NewIssue,
    /// The remote link to attach to it.
    pub link: RemoteLink,
}

impl ClonePlan {
    /// Builds the plan for cloning `issue` of `project` into `downstream_project`.
    #[must_use]
    pub fn new(project: &ProjectRef, issue: &UpstreamIssue, downstream_project: &str) -> Self {
        let reference = UpstreamRef { project: project.clone(), number: issue.number };
        Self {
            issue: NewIssue {
                project: downstream_project.to_string(),
                summary: format!("[UPSTREAM] {} #{}", issue.title, issue.number),
                description: expand_description(&issue.body, project, &issue.html_url),
                issue_type: CLONE_ISSUE_TYPE.to_string(),
            },
            link: RemoteLink { url: issue.html_url.clone(), title: reference.to_string() },
            reference,
        }
    }

    /// Human-readable preview of the plan.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "Cloning issue #{} to jira project board: {}\n\
             Summary: {}\n\
             Type: {}\n\
             Description:\n{}\n\
             Link: {} ({})\n",
            self.reference.number,
            self.issue.project,
            self.issue.summary,
            self.issue.issue_type,
            self.issue.description,
            self.link.title,
            self.link.url,
        )
    }
}

/// Rewrites task-list references (`- [ ] #123 text`) in an upstream issue
/// body into downstream link markup (` * [owner/repo#123|<url of 123>] text`).
///
/// `issue_url` is the web URL of the issue the body belongs to; the URLs of
/// referenced issues are derived from it by replacing its last path
/// segment. Other lines are kept as they are; CRLF line endings become LF.
#[must_use]
pub fn expand_description(body: &str, project: &ProjectRef, issue_url: &str) -> String {
    let url_prefix = issue_url.rsplit_once('/').map_or("", |(prefix, _)| prefix);
    body.replace("\r\n", "\n")
        .split('\n')
        .map(|line| match TASK_REF_RE.captures(line) {
            Some(caps) => {
                let number = &caps[1];
                let trailer = caps[2].trim();
                let link = format!(" * [{project}#{number}|{url_prefix}/{number}]");
                if trailer.is_empty() {
                    link
                } else {
                    format!("{link} {trailer}")
                }
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of cloning one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOutcome {
    /// What was (or would have been) written.
    pub plan: ClonePlan,
    /// The created issue, `None` on a dry run.
    pub created: Option<CreatedIssue>,
}

/// Clones upstream issues into the downstream tracker.
pub struct Cloner<'a> {
    downstream: &'a dyn DownstreamTracker,
    upstream: &'a dyn UpstreamTracker,
    guard: CallGuard,
}

impl<'a> Cloner<'a> {
    /// Creates a cloner over the given trackers.
    #[must_use]
    pub fn new(
        downstream: &'a dyn DownstreamTracker,
        upstream: &'a dyn UpstreamTracker,
        guard: CallGuard,
    ) -> Self {
        Self { downstream, upstream, guard }
    }

    /// Clones upstream issue `number` of `project` into `downstream_project`.
    ///
    /// With `dry_run`, the upstream issue is fetched and the plan returned
    /// without writing anything downstream.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream fetch, the issue creation, or the
    /// remote link creation fails, or the run is cancelled.
    pub async fn clone_issue(
        &self,
        project: &ProjectRef,
        number: u64,
        downstream_project: &str,
        dry_run: bool,
    ) -> Result<CloneOutcome, CloneError> {
        let reference = UpstreamRef { project: project.clone(), number };
        let issue =
            self.guard.run(self.upstream.get_issue(project, number)).await.map_err(|e| {
                CloneError::from_call(e, |source| CloneError::Fetch {
                    reference: reference.clone(),
                    source,
                })
            })?;
        let plan = ClonePlan::new(project, &issue, downstream_project);
        if dry_run {
            return Ok(CloneOutcome { plan, created: None });
        }

        let created =
            self.guard.run(self.downstream.create_issue(&plan.issue)).await.map_err(|e| {
                CloneError::from_call(e, |source| CloneError::Create {
                    reference: reference.clone(),
                    source,
                })
            })?;
        info!(%reference, key = %created.key, "created downstream issue");

        self.guard
            .run(self.downstream.create_remote_link(&created.id, &plan.link))
            .await
            .map_err(|e| {
                CloneError::from_call(e, |source| CloneError::Link {
                    key: created.key.clone(),
                    reference: reference.clone(),
                    source,
                })
            })?;
        Ok(CloneOutcome { plan, created: Some(created) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryDownstream, InMemoryUpstream};
    use crate::linkage::LinkResolver;

    fn sdk() -> ProjectRef {
        ProjectRef::new("operator-framework", "operator-sdk")
    }

    fn upstream_issue(number: u64, body: &str) -> UpstreamIssue {
        UpstreamIssue {
            number,
            state: "open".to_string(),
            assignee: None,
            title: "Support Go 1.22".to_string(),
            body: body.to_string(),
            html_url: format!("https://github.com/operator-framework/operator-sdk/issues/{number}"),
            is_pull_request: false,
        }
    }

    #[test]
    fn expands_task_list_references() {
        let body = "Tracking:\r\n- [ ] #6123 bump go.mod\r\n- [x] #6124 done already\r\n- [ ] #6125";
        let expanded = expand_description(
            body,
            &sdk(),
            "https://github.com/operator-framework/operator-sdk/issues/6100",
        );
        assert_eq!(
            expanded,
            "Tracking:\n \
             * [operator-framework/operator-sdk#6123|https://github.com/operator-framework/operator-sdk/issues/6123] bump go.mod\n\
             - [x] #6124 done already\n \
             * [operator-framework/operator-sdk#6125|https://github.com/operator-framework/operator-sdk/issues/6125]"
        );
    }

    #[test]
    fn trailer_keeps_further_references() {
        let expanded = expand_description(
            "- [ ] #7 see #8 first",
            &ProjectRef::new("acme", "widgets"),
            "https://github.com/acme/widgets/issues/1",
        );
        assert_eq!(expanded, " * [acme/widgets#7|https://github.com/acme/widgets/issues/7] see #8 first");
    }

    #[test]
    fn plan_names_the_upstream_issue() {
        let plan = ClonePlan::new(&sdk(), &upstream_issue(6100, "body"), "OPECO");
        assert_eq!(plan.issue.summary, "[UPSTREAM] Support Go 1.22 #6100");
        assert_eq!(plan.issue.issue_type, "Story");
        assert_eq!(plan.issue.project, "OPECO");
        assert_eq!(plan.link.title, "operator-framework/operator-sdk#6100");
        assert!(plan.render().contains("Summary: [UPSTREAM] Support Go 1.22 #6100"));
    }

    #[test]
    fn render_lists_every_field_of_the_plan() {
        let plan = ClonePlan::new(&sdk(), &upstream_issue(6100, "line one\nline two"), "OPECO");
        assert_eq!(
            plan.render(),
            "Cloning issue #6100 to jira project board: OPECO\n\
             Summary: [UPSTREAM] Support Go 1.22 #6100\n\
             Type: Story\n\
             Description:\n\
             line one\n\
             line two\n\
             Link: operator-framework/operator-sdk#6100 \
             (https://github.com/operator-framework/operator-sdk/issues/6100)\n"
        );
    }

    #[test]
    fn clone_link_resolves_back_to_the_upstream_issue() {
        let plan = ClonePlan::new(&sdk(), &upstream_issue(6100, ""), "OPECO");
        let resolved = LinkResolver::default().resolve(&plan.link).unwrap();
        assert_eq!(resolved, Some(plan.reference));
    }

    #[tokio::test]
    async fn clone_creates_issue_and_link() {
        let downstream = InMemoryDownstream::new(vec![]);
        let upstream = InMemoryUpstream::new().with_issue(&sdk(), upstream_issue(6100, "body"));
        let cloner = Cloner::new(&downstream, &upstream, CallGuard::default());

        let outcome = cloner.clone_issue(&sdk(), 6100, "OPECO", false).await.unwrap();

        let created = outcome.created.unwrap();
        assert_eq!(created.key, "OPECO-1");
        assert_eq!(downstream.created_issues(), vec![outcome.plan.issue.clone()]);
        assert_eq!(downstream.created_links(), vec![(created.id, outcome.plan.link)]);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let downstream = InMemoryDownstream::new(vec![]);
        let upstream = InMemoryUpstream::new().with_issue(&sdk(), upstream_issue(6100, "body"));
        let cloner = Cloner::new(&downstream, &upstream, CallGuard::default());

        let outcome = cloner.clone_issue(&sdk(), 6100, "OPECO", true).await.unwrap();

        assert!(outcome.created.is_none());
        assert!(downstream.created_issues().is_empty());
        assert!(downstream.created_links().is_empty());
    }

    #[tokio::test]
    async fn missing_upstream_issue_is_a_fetch_error() {
        let downstream = InMemoryDownstream::new(vec![]);
        let upstream = InMemoryUpstream::new();
        let cloner = Cloner::new(&downstream, &upstream, CallGuard::default());

        let err = cloner.clone_issue(&sdk(), 1, "OPECO", false).await.unwrap_err();
        assert!(matches!(err, CloneError::Fetch { ref reference, .. } if reference.number == 1));
        assert!(downstream.created_issues().is_empty());
    }
}
