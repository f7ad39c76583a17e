//! Token store documents.
//!
//! ```yaml
//! schema: issue-bridge.tokenstore
//! authTokens:
//!   github: ghp_...
//!   jira: ...
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{read_yaml, ConfigError};

/// Schema identifier every token store must declare.
pub const TOKEN_STORE_SCHEMA: &str = "issue-bridge.tokenstore";

/// Token store file read when none is named.
pub const DEFAULT_TOKEN_FILE: &str = "tokenstore.yaml";

/// Credentials for both trackers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    /// GitHub personal access token.
    #[serde(default)]
    pub github: Option<String>,
    /// Jira personal access token.
    #[serde(default)]
    pub jira: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenStoreDocument {
    schema: String,
    #[serde(default)]
    auth_tokens: AuthTokens,
}

/// Reads a token store. Both tokens must be present and non-empty.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, declares the
/// wrong schema, or lacks a token.
pub fn load_token_store(path: &Path) -> Result<AuthTokens, ConfigError> {
    let document: TokenStoreDocument = read_yaml(path)?;
    if document.schema != TOKEN_STORE_SCHEMA {
        return Err(ConfigError::SchemaMismatch {
            path: path.to_path_buf(),
            found: document.schema,
            expected: TOKEN_STORE_SCHEMA,
        });
    }
    let tokens = document.auth_tokens;
    for (tracker, token) in [("github", &tokens.github), ("jira", &tokens.jira)] {
        if token.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(ConfigError::MissingStoredToken { path: path.to_path_buf(), tracker });
        }
    }
    Ok(tokens)
}
