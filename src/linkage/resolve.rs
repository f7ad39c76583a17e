//! Link resolution: maps downstream remote links to upstream issue references.

use std::fmt;

use regex::Regex;
use thiserror::Error;

use crate::ports::{ProjectRef, RemoteLink};

/// Default web host of the upstream tracker.
pub const DEFAULT_UPSTREAM_HOST: &str = "github.com";

/// An upstream issue identified by project and number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpstreamRef {
    /// The `owner/repo` the issue lives in.
    pub project: ProjectRef,
    /// The issue number.
    pub number: u64,
}

impl fmt::Display for UpstreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.project, self.number)
    }
}

/// A link that looks like an upstream issue URL but cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to extract issue attributes from URL {url:?}: {reason}")]
pub struct MalformedLinkError {
    /// The offending URL.
    pub url: String,
    /// What was wrong with it.
    pub reason: String,
}

impl MalformedLinkError {
    fn new(url: &str, reason: impl Into<String>) -> Self {
        Self { url: url.to_string(), reason: reason.into() }
    }
}

/// Recognises remote links that point at issues on the upstream web host.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    host: String,
    shape: Regex,
}

impl LinkResolver {
    /// Creates a resolver for links on `host` (e.g. `github.com`).
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is empty or contains a `/`.
    pub fn new(host: &str) -> Result<Self, String> {
        if host.is_empty() || host.contains('/') {
            return Err(format!("invalid upstream host {host:?}"));
        }
        let shape = link_shape(host).map_err(|e| format!("invalid upstream host {host:?}: {e}"))?;
        Ok(Self { host: host.to_string(), shape })
    }

    /// The web host this resolver matches.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns `true` if `url` has the upstream issue shape
    /// `.../<host>/.../issues/<segment>`.
    #[must_use]
    pub fn is_upstream_link(&self, url: &str) -> bool {
        self.shape.is_match(url)
    }

    /// Resolves a remote link to the upstream issue it references.
    ///
    /// Links that do not have the upstream issue shape resolve to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedLinkError`] if the link has the upstream shape but
    /// its owner, repository, or number cannot be extracted.
    pub fn resolve(&self, link: &RemoteLink) -> Result<Option<UpstreamRef>, MalformedLinkError> {
        if !self.is_upstream_link(&link.url) {
            return Ok(None);
        }
        split_issue_ref(&link.url).map(Some)
    }
}

impl Default for LinkResolver {
    fn default() -> Self {
        Self {
            host: DEFAULT_UPSTREAM_HOST.to_string(),
            shape: link_shape(DEFAULT_UPSTREAM_HOST)
                .unwrap_or_else(|_| unreachable!("default upstream host pattern")),
        }
    }
}

/// Matches `.../<host>/.../issues/<segment>` with `host` taken literally.
fn link_shape(host: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"/{}/.+/issues/[^/]+$", regex::escape(host)))
}

/// Splits an issue URL into its `owner/repo` project and issue number.
///
/// The URL is split on `/`; owner and repo are the 4th- and 3rd-from-last
/// segments and the number is the last one:
///
/// ```text
/// https://github.com/owner/repo/issues/42
///                    ^^^^^ ^^^^        ^^
/// ```
///
/// # Errors
///
/// Returns [`MalformedLinkError`] if there are fewer than 5 segments, the
/// owner or repo segment is empty, or the last segment is not a
/// non-negative integer.
pub fn split_issue_ref(url: &str) -> Result<UpstreamRef, MalformedLinkError> {
    let segments: Vec<&str> = url.split('/').collect();
    let [.., owner, repo, _, number] = segments.as_slice() else {
        return Err(MalformedLinkError::new(url, "too few path segments"));
    };
    if segments.len() < 5 {
        return Err(MalformedLinkError::new(url, "too few path segments"));
    }
    if owner.is_empty() || repo.is_empty() {
        return Err(MalformedLinkError::new(url, "empty owner or repository"));
    }
    let number = number
        .parse::<u64>()
        .map_err(|e| {
            MalformedLinkError::new(url, format!("invalid issue number {number:?}: {e}"))
        })?;
    Ok(UpstreamRef { project: ProjectRef::new(*owner, *repo), number })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str) -> RemoteLink {
        RemoteLink { url: url.to_string(), title: "ref".to_string() }
    }

    #[test]
    fn splits_owner_repo_and_number() {
        let r = split_issue_ref("https://example.com/owner/repo/issues/42").unwrap();
        assert_eq!(r.project, ProjectRef::new("owner", "repo"));
        assert_eq!(r.number, 42);
        assert_eq!(r.to_string(), "owner/repo#42");
    }

    #[test]
    fn url_without_issue_suffix_is_malformed() {
        let err = split_issue_ref("https://example.com/owner/repo").unwrap_err();
        assert_eq!(err.url, "https://example.com/owner/repo");
    }

    #[test]
    fn non_numeric_number_is_malformed() {
        assert!(split_issue_ref("https://example.com/owner/repo/issues/abc").is_err());
        assert!(split_issue_ref("https://example.com/owner/repo/issues/-3").is_err());
        assert!(split_issue_ref("https://example.com/owner/repo/issues/").is_err());
    }

    #[test]
    fn short_urls_are_malformed() {
        assert!(split_issue_ref("owner/repo/issues/1").is_err());
        assert!(split_issue_ref("").is_err());
    }

    #[test]
    fn resolves_github_issue_links() {
        let resolver = LinkResolver::default();
        let resolved = resolver
            .resolve(&link("https://github.com/operator-framework/operator-sdk/issues/6123"))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.project.to_string(), "operator-framework/operator-sdk");
        assert_eq!(resolved.number, 6123);
    }

    #[test]
    fn ignores_links_to_other_hosts_and_pages() {
        let resolver = LinkResolver::default();
        for url in [
            "https://gitlab.com/owner/repo/issues/1",
            "https://github.com/owner/repo/pull/12",
            "https://issues.redhat.com/browse/OPECO-1",
            "https://github.com/owner/repo",
        ] {
            assert_eq!(resolver.resolve(&link(url)).unwrap(), None, "{url}");
        }
    }

    #[test]
    fn upstream_shaped_link_with_bad_number_is_an_error() {
        let resolver = LinkResolver::default();
        let err =
            resolver.resolve(&link("https://github.com/owner/repo/issues/latest")).unwrap_err();
        assert!(err.to_string().contains("latest"));
    }

    #[test]
    fn custom_host_is_matched_literally() {
        let resolver = LinkResolver::new("git.example.org").unwrap();
        assert!(resolver.is_upstream_link("https://git.example.org/a/b/issues/3"));
        assert!(!resolver.is_upstream_link("https://gitXexample.org/a/b/issues/3"));
        assert!(!resolver.is_upstream_link("https://github.com/a/b/issues/3"));
    }

    #[test]
    fn rejects_invalid_hosts() {
        assert!(LinkResolver::new("").is_err());
        assert!(LinkResolver::new("github.com/owner").is_err());
    }

    #[test]
    fn default_resolver_matches_the_default_host() {
        let default = LinkResolver::default();
        let explicit = LinkResolver::new(DEFAULT_UPSTREAM_HOST).unwrap();
        assert_eq!(default.host(), explicit.host());
        assert_eq!(default.shape.as_str(), explicit.shape.as_str());
        for url in [
            "https://github.com/a/b/issues/3",
            "https://githubXcom/a/b/issues/3",
            "https://github.com/a/b/pull/3",
        ] {
            assert_eq!(default.is_upstream_link(url), explicit.is_upstream_link(url), "{url}");
        }
        assert!(!default.is_upstream_link("https://githubXcom/a/b/issues/3"));
    }
}
