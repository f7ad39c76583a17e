//! Workflow tables: which downstream states are equivalent to each upstream state.
//!
//! A workflow definition is a YAML document:
//!
//! ```yaml
//! schema: issue-bridge.workflows
//! name: jira
//! mappings:
//!   - upstream: open
//!     downstream: [To Do, In Progress]
//!   - upstream: closed
//!     downstream: [Done, Resolved]
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Schema identifier every workflow definition must declare.
pub const WORKFLOW_SCHEMA: &str = "issue-bridge.workflows";

/// Workflow selected when none is configured.
pub const DEFAULT_WORKFLOW: &str = "jira";

/// One upstream state and the downstream states considered equivalent to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMapping {
    /// Upstream state label.
    pub upstream: String,
    /// Acceptable downstream state labels.
    #[serde(default)]
    pub downstream: Vec<String>,
}

/// A declarative workflow definition as read from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Schema identifier; must equal [`WORKFLOW_SCHEMA`].
    pub schema: String,
    /// Workflow name.
    pub name: String,
    /// State mappings, in document order.
    #[serde(default)]
    pub mappings: Vec<StateMapping>,
}

/// Failure to load a workflow table.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The workflow file could not be read.
    #[error("failed to read workflow file {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The workflow document is not valid YAML for a workflow definition.
    #[error("failed to parse workflow definition: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// The document declares a different schema.
    #[error("invalid schema: {found:?} should be {expected:?}")]
    SchemaMismatch {
        /// Schema the document declared.
        found: String,
        /// Schema that was expected.
        expected: &'static str,
    },
    /// Nothing was loaded for the selected workflow.
    #[error("no state mappings for workflow {selected:?} (definition declares {declared:?})")]
    NoMappings {
        /// Workflow that was selected.
        selected: String,
        /// Workflow the document declared.
        declared: String,
    },
}

/// Validation failed because the table cannot judge the upstream state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownStateError {
    /// The table holds no mappings at all.
    #[error("no state mappings found")]
    EmptyTable,
    /// The upstream state has no entry in the table.
    #[error("no state mapping found for {0:?}")]
    Unmapped(String),
}

/// Result of comparing an upstream and a downstream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// The downstream state is acceptable for the upstream state.
    Match,
    /// The downstream state is not acceptable for the upstream state.
    Mismatch,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Match => "MATCH",
            Self::Mismatch => "MISMATCH",
        })
    }
}

/// Upstream state → acceptable downstream states.
///
/// Read-only once built. Comparison is exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowTable {
    name: String,
    states: HashMap<String, Vec<String>>,
}

impl WorkflowTable {
    /// Builds a table from mappings. Later mappings for the same upstream
    /// state replace earlier ones.
    pub fn from_mappings(name: impl Into<String>, mappings: Vec<StateMapping>) -> Self {
        let mut states = HashMap::with_capacity(mappings.len());
        for mapping in mappings {
            states.insert(mapping.upstream, mapping.downstream);
        }
        Self { name: name.into(), states }
    }

    /// Builds the table for `selected` from a parsed definition.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::SchemaMismatch`] if the schema is wrong and
    /// [`WorkflowError::NoMappings`] if the definition is for a different
    /// workflow or has no mappings.
    pub fn from_definition(
        definition: WorkflowDefinition,
        selected: &str,
    ) -> Result<Self, WorkflowError> {
        if definition.schema != WORKFLOW_SCHEMA {
            return Err(WorkflowError::SchemaMismatch {
                found: definition.schema,
                expected: WORKFLOW_SCHEMA,
            });
        }
        if definition.name != selected || definition.mappings.is_empty() {
            return Err(WorkflowError::NoMappings {
                selected: selected.to_string(),
                declared: definition.name,
            });
        }
        Ok(Self::from_mappings(definition.name, definition.mappings))
    }

    /// Parses a YAML workflow definition and builds the table for `selected`.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or
    /// [`WorkflowTable::from_definition`] rejects it.
    pub fn from_yaml_str(yaml: &str, selected: &str) -> Result<Self, WorkflowError> {
        let definition: WorkflowDefinition = serde_yaml::from_str(yaml)?;
        Self::from_definition(definition, selected)
    }

    /// Reads a workflow file and builds the table for `selected`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are rejected.
    pub fn load(path: &Path, selected: &str) -> Result<Self, WorkflowError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|source| WorkflowError::Read { path: path.to_path_buf(), source })?;
        Self::from_yaml_str(&yaml, selected)
    }

    /// Workflow name this table was built from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of upstream states with a mapping.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the table holds no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Decides whether `downstream_state` is acceptable for `upstream_state`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownStateError`] if the table is empty or has no entry
    /// for `upstream_state`.
    pub fn validate(
        &self,
        upstream_state: &str,
        downstream_state: &str,
    ) -> Result<Outcome, UnknownStateError> {
        if self.states.is_empty() {
            return Err(UnknownStateError::EmptyTable);
        }
        let accepted = self
            .states
            .get(upstream_state)
            .ok_or_else(|| UnknownStateError::Unmapped(upstream_state.to_string()))?;
        if accepted.iter().any(|s| s == downstream_state) {
            Ok(Outcome::Match)
        } else {
            Ok(Outcome::Mismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = r"
schema: issue-bridge.workflows
name: jira
mappings:
  - upstream: open
    downstream: [To Do, In Progress]
  - upstream: closed
    downstream: [Done, Resolved]
";

    fn closed_table() -> WorkflowTable {
        WorkflowTable::from_mappings(
            "jira",
            vec![StateMapping {
                upstream: "closed".to_string(),
                downstream: vec!["Done".to_string(), "Resolved".to_string()],
            }],
        )
    }

    #[test]
    fn validates_matching_state() {
        assert_eq!(closed_table().validate("closed", "Done"), Ok(Outcome::Match));
        assert_eq!(closed_table().validate("closed", "Resolved"), Ok(Outcome::Match));
    }

    #[test]
    fn validates_mismatching_state() {
        assert_eq!(closed_table().validate("closed", "Open"), Ok(Outcome::Mismatch));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        assert_eq!(closed_table().validate("closed", "done"), Ok(Outcome::Mismatch));
        assert_eq!(
            closed_table().validate("Closed", "Done"),
            Err(UnknownStateError::Unmapped("Closed".to_string()))
        );
    }

    #[test]
    fn unmapped_upstream_state_is_an_error() {
        assert_eq!(
            closed_table().validate("open", "Done"),
            Err(UnknownStateError::Unmapped("open".to_string()))
        );
    }

    #[test]
    fn empty_table_is_an_error() {
        let table = WorkflowTable::default();
        assert!(table.is_empty());
        assert_eq!(table.validate("closed", "Done"), Err(UnknownStateError::EmptyTable));
    }

    #[test]
    fn loads_selected_workflow() {
        let table = WorkflowTable::from_yaml_str(DEFINITION, "jira").unwrap();
        assert_eq!(table.name(), "jira");
        assert_eq!(table.len(), 2);
        assert_eq!(table.validate("open", "In Progress"), Ok(Outcome::Match));
    }

    #[test]
    fn rejects_wrong_schema() {
        let yaml = DEFINITION.replace("issue-bridge.workflows", "issue-bridge.tokenstore");
        let err = WorkflowTable::from_yaml_str(&yaml, "jira").unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::SchemaMismatch { ref found, .. } if found == "issue-bridge.tokenstore"
        ));
    }

    #[test]
    fn other_workflow_name_fails_at_load() {
        let err = WorkflowTable::from_yaml_str(DEFINITION, "waterfall").unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::NoMappings { ref selected, ref declared }
                if selected == "waterfall" && declared == "jira"
        ));
    }

    #[test]
    fn definition_without_mappings_fails_at_load() {
        let yaml = "schema: issue-bridge.workflows\nname: jira\n";
        assert!(matches!(
            WorkflowTable::from_yaml_str(yaml, "jira"),
            Err(WorkflowError::NoMappings { .. })
        ));
    }

    #[test]
    fn duplicate_upstream_state_last_wins() {
        let yaml = r"
schema: issue-bridge.workflows
name: jira
mappings:
  - upstream: closed
    downstream: [Done]
  - upstream: closed
    downstream: [Closed]
";
        let table = WorkflowTable::from_yaml_str(yaml, "jira").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.validate("closed", "Closed"), Ok(Outcome::Match));
        assert_eq!(table.validate("closed", "Done"), Ok(Outcome::Mismatch));
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let err = WorkflowTable::from_yaml_str("schema: [unterminated", "jira").unwrap_err();
        assert!(matches!(err, WorkflowError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err =
            WorkflowTable::load(Path::new("/nonexistent/workflows.yaml"), "jira").unwrap_err();
        assert!(matches!(err, WorkflowError::Read { .. }));
    }

    #[test]
    fn outcome_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Outcome::Match).unwrap(), "\"MATCH\"");
        assert_eq!(Outcome::Mismatch.to_string(), "MISMATCH");
    }
}
