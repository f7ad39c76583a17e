//! Splits downstream issues into those linked to upstream issues and those dropped.

use tracing::warn;

use crate::linkage::{LinkResolver, MalformedLinkError, UpstreamRef};
use crate::ports::{CallError, CallGuard, DownstreamIssue, DownstreamTracker};

/// A downstream issue together with the upstream issues its links reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedIssue {
    /// The downstream issue.
    pub issue: DownstreamIssue,
    /// Distinct upstream references, in link order. Never empty.
    pub upstream: Vec<UpstreamRef>,
    /// Upstream-shaped links that could not be decoded.
    pub malformed: Vec<MalformedLinkError>,
}

/// Why a downstream issue takes no part in reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// None of the issue's remote links resolve to an upstream issue.
    NoUpstreamLink {
        /// Upstream-shaped links that could not be decoded.
        malformed: Vec<MalformedLinkError>,
    },
    /// The issue's remote links could not be fetched.
    LinkFetchFailed(String),
}

/// A downstream issue excluded from reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedIssue {
    /// Key of the excluded issue.
    pub key: String,
    /// Why it was excluded.
    pub reason: DropReason,
}

/// Outcome of [`partition_linked`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPartition {
    /// Issues with at least one resolving link, in input order.
    pub kept: Vec<LinkedIssue>,
    /// Issues excluded from reconciliation, in input order.
    pub dropped: Vec<DroppedIssue>,
}

/// Fetches each issue's remote links and keeps the issues that reference
/// at least one upstream issue.
///
/// Link fetch failures and timeouts drop the affected issue; they never
/// fail the partition.
///
/// # Errors
///
/// Returns [`CallError::Cancelled`] if the run is cancelled.
pub async fn partition_linked(
    issues: Vec<DownstreamIssue>,
    tracker: &dyn DownstreamTracker,
    resolver: &LinkResolver,
    guard: &CallGuard,
) -> Result<LinkPartition, CallError> {
    let mut partition = LinkPartition::default();
    for issue in issues {
        let links = match guard.run(tracker.remote_links(&issue.key)).await {
            Ok(links) => links,
            Err(CallError::Cancelled) => return Err(CallError::Cancelled),
            Err(err) => {
                warn!(key = %issue.key, error = %err, "dropping issue: remote links unavailable");
                partition.dropped.push(DroppedIssue {
                    key: issue.key,
                    reason: DropReason::LinkFetchFailed(err.to_string()),
                });
                continue;
            }
        };

        let mut upstream: Vec<UpstreamRef> = Vec::new();
        let mut malformed = Vec::new();
        for link in &links {
            match resolver.resolve(link) {
                Ok(Some(reference)) if !upstream.contains(&reference) => upstream.push(reference),
                Ok(_) => {}
                Err(err) => {
                    warn!(key = %issue.key, error = %err, "ignoring malformed upstream link");
                    malformed.push(err);
                }
            }
        }

        if upstream.is_empty() {
            let reason = DropReason::NoUpstreamLink { malformed };
            partition.dropped.push(DroppedIssue { key: issue.key, reason });
        } else {
            partition.kept.push(LinkedIssue { issue, upstream, malformed });
        }
    }
    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use crate::adapters::memory::InMemoryDownstream;
    use crate::ports::RemoteLink;

    fn issue(key: &str) -> DownstreamIssue {
        DownstreamIssue {
            id: format!("id-{key}"),
            key: key.to_string(),
            summary: String::new(),
            status: "To Do".to_string(),
            assignee: None,
        }
    }

    fn link(url: &str) -> RemoteLink {
        RemoteLink { url: url.to_string(), title: String::new() }
    }

    #[tokio::test]
    async fn keeps_only_issues_with_resolving_links() {
        let tracker = InMemoryDownstream::new(vec![])
            .with_links("A-1", vec![link("https://github.com/acme/widgets/issues/7")])
            .with_links("A-2", vec![link("https://docs.example.com/design")]);
        let issues = vec![issue("A-1"), issue("A-2"), issue("A-3")];

        let partition =
            partition_linked(issues, &tracker, &LinkResolver::default(), &CallGuard::default())
                .await
                .unwrap();

        assert_eq!(partition.kept.len(), 1);
        assert_eq!(partition.kept[0].issue.key, "A-1");
        assert_eq!(partition.kept[0].upstream[0].to_string(), "acme/widgets#7");
        let dropped: Vec<&str> = partition.dropped.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(dropped, vec!["A-2", "A-3"]);
    }

    #[tokio::test]
    async fn link_fetch_failure_drops_the_issue() {
        let tracker = InMemoryDownstream::new(vec![])
            .with_links("A-1", vec![link("https://github.com/acme/widgets/issues/7")])
            .with_failing_links("A-1");

        let partition = partition_linked(
            vec![issue("A-1")],
            &tracker,
            &LinkResolver::default(),
            &CallGuard::default(),
        )
        .await
        .unwrap();

        assert!(partition.kept.is_empty());
        assert!(matches!(partition.dropped[0].reason, DropReason::LinkFetchFailed(_)));
    }

    #[tokio::test]
    async fn malformed_link_does_not_hide_a_valid_one() {
        let tracker = InMemoryDownstream::new(vec![]).with_links(
            "A-1",
            vec![
                link("https://github.com/acme/widgets/issues/next"),
                link("https://github.com/acme/widgets/issues/9"),
            ],
        );

        let partition = partition_linked(
            vec![issue("A-1")],
            &tracker,
            &LinkResolver::default(),
            &CallGuard::default(),
        )
        .await
        .unwrap();

        assert_eq!(partition.kept.len(), 1);
        assert_eq!(partition.kept[0].upstream.len(), 1);
        assert_eq!(partition.kept[0].malformed.len(), 1);
    }

    #[tokio::test]
    async fn only_malformed_links_drop_the_issue() {
        let tracker = InMemoryDownstream::new(vec![])
            .with_links("A-1", vec![link("https://github.com/acme/widgets/issues/next")]);

        let partition = partition_linked(
            vec![issue("A-1")],
            &tracker,
            &LinkResolver::default(),
            &CallGuard::default(),
        )
        .await
        .unwrap();

        assert!(partition.kept.is_empty());
        assert!(matches!(
            &partition.dropped[0].reason,
            DropReason::NoUpstreamLink { malformed } if malformed.len() == 1
        ));
    }

    #[tokio::test]
    async fn duplicate_references_collapse() {
        let url = "https://github.com/acme/widgets/issues/7";
        let tracker = InMemoryDownstream::new(vec![]).with_links(
            "A-1",
            vec![link(url), link("https://github.com/acme/gears/issues/7"), link(url)],
        );

        let partition = partition_linked(
            vec![issue("A-1")],
            &tracker,
            &LinkResolver::default(),
            &CallGuard::default(),
        )
        .await
        .unwrap();

        let refs: Vec<String> =
            partition.kept[0].upstream.iter().map(ToString::to_string).collect();
        assert_eq!(refs, vec!["acme/widgets#7", "acme/gears#7"]);
    }

    #[tokio::test]
    async fn cancellation_aborts_the_partition() {
        let tracker = InMemoryDownstream::new(vec![]);
        let guard = CallGuard::default();
        guard.token().cancel();

        let err = partition_linked(vec![issue("A-1")], &tracker, &LinkResolver::default(), &guard)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn link_fetch_timeout_drops_only_that_issue() {
        let url = "https://github.com/acme/widgets/issues/7";
        let tracker = InMemoryDownstream::new(vec![])
            .with_links("A-1", vec![link(url)])
            .with_slow_links("A-1", Duration::from_secs(5))
            .with_links("A-2", vec![link(url)]);
        let guard = CallGuard::new(CancellationToken::new(), Duration::from_millis(100));

        let partition = partition_linked(
            vec![issue("A-1"), issue("A-2")],
            &tracker,
            &LinkResolver::default(),
            &guard,
        )
        .await
        .unwrap();

        assert_eq!(partition.kept.len(), 1);
        assert_eq!(partition.kept[0].issue.key, "A-2");
        assert_eq!(partition.dropped.len(), 1);
        assert_eq!(partition.dropped[0].key, "A-1");
        assert!(matches!(
            &partition.dropped[0].reason,
            DropReason::LinkFetchFailed(reason) if reason.contains("timed out")
        ));
    }
}
