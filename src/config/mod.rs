//! Run configuration: profiles, token stores, and settings resolution.
//!
//! Values are resolved with this precedence, highest first:
//! explicit flags, the selected profile, `GITHUB_TOKEN`/`JIRA_TOKEN`
//! environment variables, built-in defaults.

pub mod profiles;
pub mod tokens;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::adapters::live::github::DEFAULT_GITHUB_API_URL;
use crate::adapters::live::jira::DEFAULT_JIRA_BASE_URL;
use crate::adapters::live::{GithubClientConfig, JiraClientConfig};
use crate::ports::{CallGuard, ProjectRef};
use crate::workflow::{WorkflowError, WorkflowTable, DEFAULT_WORKFLOW};

pub use profiles::{DomainConfig, Profile, Profiles, DEFAULT_PROFILES_FILE};
pub use tokens::{load_token_store, AuthTokens, DEFAULT_TOKEN_FILE, TOKEN_STORE_SCHEMA};

/// Upstream project used when none is configured.
pub const DEFAULT_GITHUB_PROJECT: &str = "operator-framework/operator-sdk";

/// Downstream project used when none is configured.
pub const DEFAULT_JIRA_PROJECT: &str = "OPECO";

/// Workflow file read when none is named.
pub const DEFAULT_WORKFLOW_FILE: &str = "workflows.yaml";

/// Environment variable holding the GitHub token.
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Environment variable holding the Jira token.
pub const JIRA_TOKEN_VAR: &str = "JIRA_TOKEN";

/// Downstream clause excluding closed issues.
const OPEN_ISSUES_CLAUSE: &str = "status != Closed";

/// Invalid or incomplete configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A configuration file is not valid YAML for its document type.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// A document declares the wrong schema.
    #[error("invalid schema in {}: {found:?} should be {expected:?}", path.display())]
    SchemaMismatch {
        /// Offending file.
        path: PathBuf,
        /// Schema the document declared.
        found: String,
        /// Schema that was expected.
        expected: &'static str,
    },
    /// A token store lacks a token.
    #[error("missing required {tracker} token in {}", path.display())]
    MissingStoredToken {
        /// Offending file.
        path: PathBuf,
        /// Tracker whose token is missing.
        tracker: &'static str,
    },
    /// The selected profile does not exist.
    #[error("profile {0:?} not found")]
    ProfileNotFound(String),
    /// No token is available for a tracker.
    #[error("no {tracker} token configured (use --token-file, a profile token store, or {var})")]
    MissingToken {
        /// Tracker whose token is missing.
        tracker: &'static str,
        /// Environment variable that would supply it.
        var: &'static str,
    },
    /// The upstream project is not `owner/repo`.
    #[error("invalid github project {value:?}: {reason}")]
    InvalidProject {
        /// Configured value.
        value: String,
        /// What was wrong with it.
        reason: String,
    },
    /// No downstream project is configured.
    #[error("no jira project configured")]
    MissingJiraProject,
    /// Neither a downstream project nor a query was given.
    #[error("must provide either a jira project or a query")]
    EmptyQuery,
}

/// Reads and deserializes a YAML document.
pub(crate) fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let yaml = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_yaml::from_str(&yaml)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Profiles document.
    pub profiles_file: Option<PathBuf>,
    /// Profile to select.
    pub profile_name: Option<String>,
    /// Token store to read instead of the profile's.
    pub token_file: Option<PathBuf>,
    /// Upstream project (`owner/repo`).
    pub github_project: Option<String>,
    /// Downstream project key.
    pub jira_project: Option<String>,
    /// Downstream base URL.
    pub jira_base_url: Option<String>,
    /// Workflow definition file.
    pub workflow_file: Option<PathBuf>,
    /// Workflow to load from the definition file.
    pub workflow_name: Option<String>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Upstream project, `owner/repo`.
    pub github_project: String,
    /// Downstream project key.
    pub jira_project: String,
    /// Downstream base URL.
    pub jira_base_url: String,
    /// Tracker credentials.
    pub tokens: AuthTokens,
    /// Workflow definition file.
    pub workflow_file: PathBuf,
    /// Workflow to load.
    pub workflow_name: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github_project: DEFAULT_GITHUB_PROJECT.to_string(),
            jira_project: DEFAULT_JIRA_PROJECT.to_string(),
            jira_base_url: DEFAULT_JIRA_BASE_URL.to_string(),
            tokens: AuthTokens::default(),
            workflow_file: PathBuf::from(DEFAULT_WORKFLOW_FILE),
            workflow_name: DEFAULT_WORKFLOW.to_string(),
            timeout: CallGuard::DEFAULT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Resolves settings from explicit overrides, the selected profile, the
    /// environment (looked up through `env`), and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected profile does not exist or a profile
    /// or token store file cannot be loaded.
    pub fn resolve(
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        let mut token_store: Option<PathBuf> = None;

        if let Some(name) = &overrides.profile_name {
            let path = overrides
                .profiles_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILES_FILE));
            let profiles = Profiles::load(&path)?;
            let profile =
                profiles.get(name).ok_or_else(|| ConfigError::ProfileNotFound(name.clone()))?;
            debug!(profile = %name, file = %path.display(), "applying profile");
            if !profile.github_config.project.is_empty() {
                settings.github_project.clone_from(&profile.github_config.project);
            }
            if !profile.jira_config.project.is_empty() {
                settings.jira_project.clone_from(&profile.jira_config.project);
            }
            if !profile.lifecycle_mapping.is_empty() {
                settings.workflow_name.clone_from(&profile.lifecycle_mapping);
            }
            token_store.clone_from(&profile.token_store);
        }
        if overrides.token_file.is_some() {
            token_store.clone_from(&overrides.token_file);
        }

        settings.tokens = match token_store {
            Some(path) => load_token_store(&path)?,
            None => Self::ambient_tokens(&env)?,
        };

        if let Some(project) = &overrides.github_project {
            settings.github_project.clone_from(project);
        }
        if let Some(project) = &overrides.jira_project {
            settings.jira_project.clone_from(project);
        }
        if let Some(url) = &overrides.jira_base_url {
            settings.jira_base_url.clone_from(url);
        }
        if let Some(file) = &overrides.workflow_file {
            settings.workflow_file.clone_from(file);
        }
        if let Some(name) = &overrides.workflow_name {
            settings.workflow_name.clone_from(name);
        }
        if let Some(timeout) = overrides.timeout {
            settings.timeout = timeout;
        }
        Ok(settings)
    }

    /// Tokens from the environment, completed from the default token store
    /// when it exists.
    fn ambient_tokens(env: &impl Fn(&str) -> Option<String>) -> Result<AuthTokens, ConfigError> {
        let non_empty = |var: &str| env(var).filter(|v| !v.trim().is_empty());
        let mut tokens =
            AuthTokens { github: non_empty(GITHUB_TOKEN_VAR), jira: non_empty(JIRA_TOKEN_VAR) };
        let default_store = Path::new(DEFAULT_TOKEN_FILE);
        if (tokens.github.is_none() || tokens.jira.is_none()) && default_store.is_file() {
            let stored = load_token_store(default_store)?;
            tokens.github = tokens.github.or(stored.github);
            tokens.jira = tokens.jira.or(stored.jira);
        }
        Ok(tokens)
    }

    /// The upstream project as `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured project is not `owner/repo`.
    pub fn upstream_project(&self) -> Result<ProjectRef, ConfigError> {
        self.github_project.parse().map_err(|reason| ConfigError::InvalidProject {
            value: self.github_project.clone(),
            reason,
        })
    }

    /// Connection settings for the downstream tracker.
    ///
    /// # Errors
    ///
    /// Returns an error if no Jira token is configured.
    pub fn jira_client_config(&self) -> Result<JiraClientConfig, ConfigError> {
        let token = self
            .tokens
            .jira
            .clone()
            .ok_or(ConfigError::MissingToken { tracker: "jira", var: JIRA_TOKEN_VAR })?;
        Ok(JiraClientConfig { base_url: self.jira_base_url.clone(), token, timeout: self.timeout })
    }

    /// Connection settings for the upstream tracker.
    ///
    /// # Errors
    ///
    /// Returns an error if no GitHub token is configured.
    pub fn github_client_config(&self) -> Result<GithubClientConfig, ConfigError> {
        let token = self
            .tokens
            .github
            .clone()
            .ok_or(ConfigError::MissingToken { tracker: "github", var: GITHUB_TOKEN_VAR })?;
        Ok(GithubClientConfig {
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            token,
            timeout: self.timeout,
        })
    }

    /// Loads the configured workflow table.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow file cannot be loaded or holds no
    /// mappings for the configured workflow.
    pub fn load_workflow(&self) -> Result<WorkflowTable, WorkflowError> {
        WorkflowTable::load(&self.workflow_file, &self.workflow_name)
    }

    /// Downstream query selecting the open issues of the configured project,
    /// narrowed by `extra` when given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingJiraProject`] if no project is configured.
    pub fn reconcile_query(&self, extra: Option<&str>) -> Result<String, ConfigError> {
        let project = self.jira_project.trim();
        if project.is_empty() {
            return Err(ConfigError::MissingJiraProject);
        }
        let mut jql = format!("project={project} and {OPEN_ISSUES_CLAUSE}");
        if let Some(extra) = extra.map(str::trim).filter(|q| !q.is_empty()) {
            jql.push_str(&format!(" AND ({extra})"));
        }
        Ok(jql)
    }

    /// Downstream query for listing: the project ANDed with `query`, limited
    /// to issues that are not closed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyQuery`] if neither a project nor a query
    /// is available.
    pub fn list_query(&self, query: Option<&str>) -> Result<String, ConfigError> {
        let project = self.jira_project.trim();
        let query = query.map(str::trim).unwrap_or_default();
        let base = match (project.is_empty(), query.is_empty()) {
            (true, true) => return Err(ConfigError::EmptyQuery),
            (false, false) => format!("project={project} AND {query}"),
            (false, true) => format!("project={project}"),
            (true, false) => query.to_string(),
        };
        Ok(format!("{base} and {OPEN_ISSUES_CLAUSE}"))
    }
}
