//! Core library entry for the `issue-bridge` CLI.
//!
//! Downstream (Jira) issues carry remote links to the upstream (GitHub)
//! issues they track. Reconciliation follows those links and checks each
//! pair of lifecycle states against a workflow table.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod clone;
pub mod commands;
pub mod config;
pub mod context;
pub mod linkage;
pub mod logging;
pub mod ports;
pub mod reconcile;
pub mod workflow;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// `--help` and `--version` print their output and succeed.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub async fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    logging::init(cli.global.verbose);
    commands::dispatch(&cli).await
}

#[cfg(test)]
mod tests {
    use super::run;

    #[tokio::test]
    async fn run_prints_help() {
        assert!(run(["issue-bridge", "--help"]).await.is_ok());
    }

    #[tokio::test]
    async fn run_errors_on_unknown_subcommand() {
        let err = run(["issue-bridge", "unknown"]).await.unwrap_err();
        assert!(err.contains("unrecognized subcommand"));
    }

    #[tokio::test]
    async fn run_errors_on_unknown_profile() {
        let dir = std::env::temp_dir().join("issue_bridge_lib_profiles");
        std::fs::create_dir_all(&dir).unwrap();
        let profiles = dir.join("profiles.yaml");
        std::fs::write(&profiles, "profiles: []\n").unwrap();

        let err = run([
            "issue-bridge",
            "--profiles-file",
            profiles.to_str().unwrap(),
            "--profile-name",
            "missing",
            "jira",
            "list",
        ])
        .await
        .unwrap_err();
        assert!(err.contains("profile \"missing\" not found"));
    }
}
