//! CLI argument definitions.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::profiles::DEFAULT_PROFILES_FILE;
use crate::config::{ConfigOverrides, DEFAULT_WORKFLOW_FILE};
use crate::reconcile::report::OutputFormat;

/// Top-level CLI parser for `issue-bridge`.
#[derive(Debug, Parser)]
#[command(
    name = "issue-bridge",
    version,
    about = "Link upstream GitHub issues to downstream Jira issues and reconcile their states"
)]
pub struct Cli {
    /// Settings shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every command.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Profiles document.
    #[arg(long, global = true, default_value = DEFAULT_PROFILES_FILE)]
    pub profiles_file: PathBuf,

    /// Profile to apply, selected by its description.
    #[arg(long, global = true)]
    pub profile_name: Option<String>,

    /// Token store holding the GitHub and Jira tokens.
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    /// Upstream project as `owner/repo`.
    #[arg(long, global = true)]
    pub github_project: Option<String>,

    /// Downstream project key.
    #[arg(long, global = true)]
    pub jira_project: Option<String>,

    /// Downstream base URL.
    #[arg(long, global = true)]
    pub jira_base_url: Option<String>,

    /// Workflow definition file.
    #[arg(long, global = true, default_value = DEFAULT_WORKFLOW_FILE)]
    pub workflow_file: PathBuf,

    /// Workflow to load from the definition file.
    #[arg(long, global = true)]
    pub workflow_name: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// The flags as configuration overrides.
    #[must_use]
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            profiles_file: Some(self.profiles_file.clone()),
            profile_name: self.profile_name.clone(),
            token_file: self.token_file.clone(),
            github_project: self.github_project.clone(),
            jira_project: self.jira_project.clone(),
            jira_base_url: self.jira_base_url.clone(),
            workflow_file: Some(self.workflow_file.clone()),
            workflow_name: self.workflow_name.clone(),
            timeout: self.timeout.map(Duration::from_secs),
        }
    }
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compare the states of linked upstream and downstream issues.
    Reconcile {
        /// Extra JQL narrowing the downstream search.
        #[arg(long)]
        query: Option<String>,

        /// Print a machine-readable report instead of one line per pair.
        #[arg(long)]
        porcelain: bool,

        /// Format of the machine-readable report.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },
    /// Clone upstream issues into the downstream project.
    Clone {
        /// Upstream issue numbers.
        #[arg(value_name = "ISSUE", required = true)]
        issues: Vec<u64>,

        /// Print the planned issues without creating anything.
        #[arg(long)]
        dryrun: bool,
    },
    /// Commands against the upstream tracker.
    Github {
        /// The GitHub command to execute.
        #[command(subcommand)]
        command: GithubCommand,
    },
    /// Commands against the downstream tracker.
    Jira {
        /// The Jira command to execute.
        #[command(subcommand)]
        command: JiraCommand,
    },
}

/// GitHub subcommands.
#[derive(Debug, Subcommand)]
pub enum GithubCommand {
    /// List open issues of the upstream project.
    List {
        /// Only issues in this milestone.
        #[arg(long)]
        milestone: Option<String>,

        /// Only issues assigned to this user.
        #[arg(long)]
        assignee: Option<String>,

        /// Only issues carrying this label (repeatable).
        #[arg(long = "label")]
        labels: Vec<String>,
    },
}

/// Jira subcommands.
#[derive(Debug, Subcommand)]
pub enum JiraCommand {
    /// List open issues of the downstream project.
    List {
        /// JQL ANDed with the project clause.
        #[arg(long)]
        query: Option<String>,
    },
}
