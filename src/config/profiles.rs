//! Named profiles bundling a project pair, a workflow, and a token store.
//!
//! ```yaml
//! profiles:
//!   - description: sdk
//!     githubConfig:
//!       project: operator-framework/operator-sdk
//!     jiraConfig:
//!       project: OPECO
//!     lifecycleMapping: jira
//!     tokensStore: tokenstore.yaml
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{read_yaml, ConfigError};

/// Profiles file read when none is named.
pub const DEFAULT_PROFILES_FILE: &str = "profiles.yaml";

/// Per-tracker settings of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Project on the tracker (`owner/repo` upstream, project key downstream).
    #[serde(default)]
    pub project: String,
    /// Lifecycle label of the project, informational.
    #[serde(default)]
    pub lifecycle: String,
}

/// One named profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Name used to select the profile.
    #[serde(default)]
    pub description: String,
    /// Upstream settings.
    #[serde(default)]
    pub github_config: DomainConfig,
    /// Downstream settings.
    #[serde(default)]
    pub jira_config: DomainConfig,
    /// Workflow name used for state validation.
    #[serde(default)]
    pub lifecycle_mapping: String,
    /// Token store file for this profile.
    #[serde(default, rename = "tokensStore")]
    pub token_store: Option<PathBuf>,
}

/// A profiles document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profiles {
    /// Every declared profile, in document order.
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Profiles {
    /// Reads a profiles document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_yaml(path)
    }

    /// First profile whose description equals `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.description == name)
    }
}
