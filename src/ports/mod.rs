//! Port traits defining the tracker boundaries.
//!
//! Each trait represents a boundary between the reconciliation core and an
//! external issue tracker. Implementations live in `src/adapters/`.

pub mod downstream;
pub mod guard;
pub mod upstream;

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

pub use downstream::{
    search_all, CreatedIssue, DownstreamIssue, DownstreamTracker, NewIssue, RemoteLink,
    SearchPage,
};
pub use guard::{CallError, CallGuard};
pub use upstream::{
    list_all, IssueFilter, IssuePage, ProjectRef, UpstreamIssue, UpstreamTracker,
};

/// Error type returned by every port method.
pub type PortError = Box<dyn Error + Send + Sync>;

/// Boxed future type alias used by the tracker ports to keep them dyn-compatible.
pub type TrackerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PortError>> + Send + 'a>>;
