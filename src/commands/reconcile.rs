//! `issue-bridge reconcile` command.

use std::io::Write;

use tracing::info;

use super::emit;
use crate::config::Settings;
use crate::context::TrackerContext;
use crate::linkage::LinkResolver;
use crate::ports::CallGuard;
use crate::reconcile::report::{render_lines, render_porcelain, OutputFormat};
use crate::reconcile::Reconciler;

/// How the report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// One line per pair.
    Lines {
        /// Emit ANSI colors.
        colorize: bool,
    },
    /// A single structured document.
    Porcelain(OutputFormat),
}

/// Execute the `reconcile` command.
///
/// # Errors
///
/// Returns an error string if the workflow cannot be loaded, a tracker is
/// unavailable, or the reconciliation fails.
pub async fn run(
    settings: &Settings,
    ctx: &TrackerContext,
    guard: &CallGuard,
    query: Option<&str>,
    style: Style,
    out: &mut dyn Write,
) -> Result<(), String> {
    let table = settings.load_workflow().map_err(|e| e.to_string())?;
    let jql = settings.reconcile_query(query).map_err(|e| e.to_string())?;
    let downstream = ctx.downstream()?;
    let upstream = ctx.upstream()?;
    info!(workflow = table.name(), query = %jql, "reconciling");

    let resolver = LinkResolver::default();
    let report = Reconciler::new(&table, &resolver, guard.clone())
        .reconcile(&jql, Some(downstream), Some(upstream))
        .await
        .map_err(|e| e.to_string())?;

    let text = match style {
        Style::Porcelain(format) => render_porcelain(&report, format)?,
        Style::Lines { colorize } => render_lines(&report, colorize),
    };
    emit(out, &text)
}
