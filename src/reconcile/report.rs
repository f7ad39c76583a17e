//! Rendering of reconciliation reports for people and for scripts.
//!
//! Colors respect `NO_COLOR=1` and are only used when stdout is a terminal.

use std::io::IsTerminal;

use clap::ValueEnum;

use super::{ReconcileReport, ReconciliationPair};
use crate::workflow::Outcome;

const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Structured output format for `--porcelain`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// A single YAML document.
    Yaml,
}

/// Check if colors should be enabled for stdout.
pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }
    std::io::stdout().is_terminal()
}

/// Serializes a report in a machine-readable format.
///
/// YAML output starts with a `---` document marker.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_porcelain(report: &ReconcileReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map(|json| json + "\n")
            .map_err(|e| format!("failed to serialize report as JSON: {e}")),
        OutputFormat::Yaml => serde_yaml::to_string(report)
            .map(|yaml| format!("---\n{yaml}"))
            .map_err(|e| format!("failed to serialize report as YAML: {e}")),
    }
}

/// Renders one line per pair, matches first, each group in search order.
#[must_use]
pub fn render_lines(report: &ReconcileReport, colorize: bool) -> String {
    let mut out = String::new();
    for pair in report.matches.iter().chain(&report.mismatches) {
        out.push_str(&render_line(pair, colorize));
        out.push('\n');
    }
    out
}

fn render_line(pair: &ReconciliationPair, colorize: bool) -> String {
    let paint = |code: &'static str| if colorize { code } else { "" };
    let outcome_color = match pair.outcome {
        Outcome::Match => GREEN,
        Outcome::Mismatch => RED,
    };
    format!(
        "{}{}/({}){} status (g: {:?}\tj: {:?})\t{}{}{}",
        paint(YELLOW),
        pair.downstream.name,
        pair.upstream.name,
        paint(RESET),
        pair.upstream.status,
        pair.downstream.status,
        paint(outcome_color),
        pair.outcome,
        paint(RESET),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::IssueStatus;

    fn pair(key: &str, down: &str, up: &str, outcome: Outcome) -> ReconciliationPair {
        ReconciliationPair {
            downstream: IssueStatus {
                name: key.to_string(),
                status: down.to_string(),
                assignee: "Jane Doe".to_string(),
            },
            upstream: IssueStatus {
                name: "acme/widgets#7".to_string(),
                status: up.to_string(),
                assignee: "unassigned".to_string(),
            },
            outcome,
        }
    }

    fn report() -> ReconcileReport {
        ReconcileReport {
            matches: vec![pair("OPECO-1", "Done", "closed", Outcome::Match)],
            mismatches: vec![pair("OPECO-2", "To Do", "closed", Outcome::Mismatch)],
        }
    }

    #[test]
    fn plain_lines() {
        let out = render_lines(&report(), false);
        assert_eq!(
            out,
            "OPECO-1/(acme/widgets#7) status (g: \"closed\"\tj: \"Done\")\tMATCH\n\
             OPECO-2/(acme/widgets#7) status (g: \"closed\"\tj: \"To Do\")\tMISMATCH\n"
        );
    }

    #[test]
    fn colored_lines_mark_outcomes() {
        let out = render_lines(&report(), true);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("\x1b[33mOPECO-1/(acme/widgets#7)\x1b[0m"));
        assert!(lines[0].ends_with("\x1b[32mMATCH\x1b[0m"));
        assert!(lines[1].ends_with("\x1b[31mMISMATCH\x1b[0m"));
    }

    #[test]
    fn empty_report_renders_nothing() {
        assert_eq!(render_lines(&ReconcileReport::default(), true), "");
    }

    #[test]
    fn json_uses_named_collections() {
        let json = render_porcelain(&report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["matches"][0]["downstream"]["name"], "OPECO-1");
        assert_eq!(value["matches"][0]["upstream"]["assignee"], "unassigned");
        assert_eq!(value["matches"][0]["outcome"], "MATCH");
        assert_eq!(value["mismatches"][0]["downstream"]["status"], "To Do");
    }

    #[test]
    fn yaml_starts_with_document_marker() {
        let yaml = render_porcelain(&report(), OutputFormat::Yaml).unwrap();
        assert!(yaml.starts_with("---\n"));
        let parsed: ReconcileReport = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, report());
    }
}
