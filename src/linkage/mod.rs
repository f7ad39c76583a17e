//! Linkage resolution.
//!
//! Downstream issues reference their upstream counterpart through remote
//! links. The resolver recognises links to upstream issues and decodes the
//! project and issue number from the URL.

pub mod resolve;

pub use resolve::{split_issue_ref, LinkResolver, MalformedLinkError, UpstreamRef};
