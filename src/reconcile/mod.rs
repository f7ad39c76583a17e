//! Reconciliation of downstream issues against the upstream issues they link to.
//!
//! A run searches the downstream tracker, keeps the issues whose remote
//! links reference upstream issues, fetches each referenced upstream issue,
//! and classifies every pair with the workflow table.

pub mod partition;
pub mod report;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span, Instrument};

use crate::linkage::{LinkResolver, UpstreamRef};
use crate::ports::{
    search_all, CallError, CallGuard, DownstreamIssue, DownstreamTracker, UpstreamIssue,
    UpstreamTracker,
};
use crate::workflow::{Outcome, UnknownStateError, WorkflowTable};

pub use partition::{partition_linked, DropReason, DroppedIssue, LinkPartition, LinkedIssue};

/// Assignee shown when an issue has none.
pub const UNASSIGNED: &str = "unassigned";

/// Issues requested per downstream search page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Failure that aborts a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A tracker client was not supplied.
    #[error("missing {0} tracker client")]
    MissingClient(&'static str),
    /// The downstream search failed.
    #[error("downstream search failed: {0}")]
    Search(#[source] CallError),
    /// A linked upstream issue could not be fetched.
    #[error("failed to fetch upstream issue {reference} linked from {downstream}: {source}")]
    UpstreamFetch {
        /// Key of the downstream issue holding the link.
        downstream: String,
        /// The upstream issue that could not be fetched.
        reference: UpstreamRef,
        /// Why the fetch failed.
        #[source]
        source: CallError,
    },
    /// The workflow table could not judge a pair.
    #[error("cannot validate {downstream} against {reference}: {source}")]
    UnknownState {
        /// Key of the downstream issue.
        downstream: String,
        /// The upstream issue.
        reference: UpstreamRef,
        /// The validator failure.
        #[source]
        source: UnknownStateError,
    },
    /// The run was cancelled.
    #[error("reconciliation cancelled")]
    Cancelled,
}

impl ReconcileError {
    fn from_call(err: CallError, wrap: impl FnOnce(CallError) -> Self) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            wrap(err)
        }
    }
}

/// Display record for one side of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatus {
    /// Issue name (`KEY` downstream, `owner/repo#N` upstream).
    pub name: String,
    /// Lifecycle state label.
    pub status: String,
    /// Assignee, or [`UNASSIGNED`].
    pub assignee: String,
}

/// One downstream/upstream correspondence and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPair {
    /// The downstream side.
    pub downstream: IssueStatus,
    /// The upstream side.
    pub upstream: IssueStatus,
    /// Whether the states are consistent.
    pub outcome: Outcome,
}

impl ReconciliationPair {
    /// Builds the pair for a downstream issue and the upstream issue it links to.
    #[must_use]
    pub fn new(
        downstream: &DownstreamIssue,
        reference: &UpstreamRef,
        upstream: &UpstreamIssue,
        outcome: Outcome,
    ) -> Self {
        Self {
            downstream: IssueStatus {
                name: downstream.key.clone(),
                status: downstream.status.clone(),
                assignee: downstream.assignee.clone().unwrap_or_else(|| UNASSIGNED.to_string()),
            },
            upstream: IssueStatus {
                name: format!("{}#{}", reference.project, upstream.number),
                status: upstream.state.clone(),
                assignee: upstream.assignee.clone().unwrap_or_else(|| UNASSIGNED.to_string()),
            },
            outcome,
        }
    }
}

/// Pairs of a run, bucketed by outcome in search order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Pairs whose states are consistent.
    pub matches: Vec<ReconciliationPair>,
    /// Pairs whose states are inconsistent.
    pub mismatches: Vec<ReconciliationPair>,
}

impl ReconcileReport {
    /// Total number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len() + self.mismatches.len()
    }

    /// Returns `true` if the run produced no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.mismatches.is_empty()
    }

    fn push(&mut self, pair: ReconciliationPair) {
        match pair.outcome {
            Outcome::Match => self.matches.push(pair),
            Outcome::Mismatch => self.mismatches.push(pair),
        }
    }
}

/// Compares downstream issues with the upstream issues they link to.
///
/// Calls are issued one at a time; every call goes through the same
/// [`CallGuard`].
#[derive(Debug)]
pub struct Reconciler<'a> {
    table: &'a WorkflowTable,
    resolver: &'a LinkResolver,
    guard: CallGuard,
    page_size: usize,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler over a loaded workflow table.
    #[must_use]
    pub fn new(table: &'a WorkflowTable, resolver: &'a LinkResolver, guard: CallGuard) -> Self {
        Self { table, resolver, guard, page_size: DEFAULT_PAGE_SIZE }
    }

    /// Sets the number of issues requested per search page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Runs one reconciliation pass for the downstream issues matching `query`.
    ///
    /// # Errors
    ///
    /// Fails if a client is missing, the search fails, a linked upstream
    /// issue cannot be fetched, the workflow table cannot judge a pair, or
    /// the run is cancelled. Remote-link lookup failures only drop the
    /// affected issue.
    pub async fn reconcile(
        &self,
        query: &str,
        downstream: Option<&dyn DownstreamTracker>,
        upstream: Option<&dyn UpstreamTracker>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let downstream = downstream.ok_or(ReconcileError::MissingClient("downstream"))?;
        let upstream = upstream.ok_or(ReconcileError::MissingClient("upstream"))?;

        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("reconcile", %run_id, workflow = self.table.name());
        self.run(query, downstream, upstream).instrument(span).await
    }

    async fn run(
        &self,
        query: &str,
        downstream: &dyn DownstreamTracker,
        upstream: &dyn UpstreamTracker,
    ) -> Result<ReconcileReport, ReconcileError> {
        if self.guard.token().is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        let issues = search_all(downstream, query, self.page_size, &self.guard)
            .await
            .map_err(|e| ReconcileError::from_call(e, ReconcileError::Search))?;
        let searched = issues.len();

        let partition = partition_linked(issues, downstream, self.resolver, &self.guard)
            .await
            .map_err(|_| ReconcileError::Cancelled)?;

        let mut report = ReconcileReport::default();
        for linked in &partition.kept {
            for reference in &linked.upstream {
                let upstream_issue = self
                    .guard
                    .run(upstream.get_issue(&reference.project, reference.number))
                    .await
                    .map_err(|e| {
                        ReconcileError::from_call(e, |source| ReconcileError::UpstreamFetch {
                            downstream: linked.issue.key.clone(),
                            reference: reference.clone(),
                            source,
                        })
                    })?;
                let outcome = self
                    .table
                    .validate(&upstream_issue.state, &linked.issue.status)
                    .map_err(|source| ReconcileError::UnknownState {
                        downstream: linked.issue.key.clone(),
                        reference: reference.clone(),
                        source,
                    })?;
                report.push(ReconciliationPair::new(
                    &linked.issue,
                    reference,
                    &upstream_issue,
                    outcome,
                ));
            }
        }

        info!(
            searched,
            linked = partition.kept.len(),
            dropped = partition.dropped.len(),
            matches = report.matches.len(),
            mismatches = report.mismatches.len(),
            "reconciliation complete"
        );
        Ok(report)
    }
}
