//! Command dispatch and handlers.

pub mod clone;
pub mod github;
pub mod jira;
pub mod reconcile;

use std::io::Write;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Cli, Command, GithubCommand, JiraCommand};
use crate::config::Settings;
use crate::context::TrackerContext;
use crate::ports::CallGuard;
use crate::reconcile::report;

/// Dispatch a parsed command to its handler.
///
/// Settings are resolved from the flags, the selected profile, and the
/// environment. When `ISSUE_BRIDGE_RECORD` is set to a file path, all tracker
/// interactions are recorded to that cassette; `ISSUE_BRIDGE_REPLAY` serves
/// them from one instead. Ctrl-C cancels in-flight tracker calls.
///
/// # Errors
///
/// Returns an error string if configuration fails or the command handler fails.
pub async fn dispatch(cli: &Cli) -> Result<(), String> {
    let settings = Settings::resolve(&cli.global.to_overrides(), |var| std::env::var(var).ok())
        .map_err(|e| e.to_string())?;
    let ctx = TrackerContext::from_env(&settings)?;
    let guard = CallGuard::new(CancellationToken::new(), settings.timeout);
    let interrupt = spawn_interrupt_handler(guard.token().clone());

    let mut stdout = std::io::stdout();
    let result = dispatch_with_context(&cli.command, &settings, &ctx, &guard, &mut stdout).await;
    interrupt.abort();

    // Finish recording after the command completes (even on error)
    match ctx.finish() {
        Ok(Some(path)) => eprintln!("Recording saved to: {}", path.display()),
        Ok(None) => {}
        Err(err) if result.is_ok() => return Err(err),
        Err(err) => warn!(%err, "failed to save recording"),
    }
    result
}

/// Dispatch a command with the given settings and trackers, writing its
/// output to `out`.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub async fn dispatch_with_context(
    command: &Command,
    settings: &Settings,
    ctx: &TrackerContext,
    guard: &CallGuard,
    out: &mut dyn Write,
) -> Result<(), String> {
    match command {
        Command::Reconcile { query, porcelain, output } => {
            let style = if *porcelain {
                reconcile::Style::Porcelain(*output)
            } else {
                reconcile::Style::Lines { colorize: report::should_colorize() }
            };
            reconcile::run(settings, ctx, guard, query.as_deref(), style, out).await
        }
        Command::Clone { issues, dryrun } => {
            clone::run(settings, ctx, guard, issues, *dryrun, out).await
        }
        Command::Github { command: GithubCommand::List { milestone, assignee, labels } } => {
            let filter = crate::ports::IssueFilter {
                milestone: milestone.clone(),
                assignee: assignee.clone(),
                labels: labels.clone(),
            };
            github::list(settings, ctx, guard, &filter, out).await
        }
        Command::Jira { command: JiraCommand::List { query } } => {
            jira::list(settings, ctx, guard, query.as_deref(), out).await
        }
    }
}

fn spawn_interrupt_handler(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling tracker calls");
            token.cancel();
        }
    })
}

/// Writes handler output, mapping I/O failures to an error string.
pub(crate) fn emit(out: &mut dyn Write, text: &str) -> Result<(), String> {
    out.write_all(text.as_bytes()).map_err(|e| format!("failed to write output: {e}"))
}
