//! CLI output formatting and display helpers.
//!
//! Everything here writes to stdout; diagnostics go through `tracing` on stderr.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use iadl_core::{FileLink, JobReport, JobSummary, TaskStatus};
use serde::Serialize;

/// Printed when discovery found nothing to act on.
pub(crate) const NO_FILES_FOUND: &str = "No files found";

/// Printed after a preview run.
pub(crate) const PREVIEW_DONE: &str = "Preview only: no files were downloaded";

/// Per-task row of the JSON summary.
#[derive(Debug, Serialize)]
struct TaskRow<'a> {
    url: &'a str,
    file_name: &'a str,
    status: TaskStatus,
    attempts: u32,
    error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    summary: JobSummary,
    tasks: Vec<TaskRow<'a>>,
}

/// Renders the human-readable completion summary.
pub(crate) fn format_summary(report: &JobReport, destination: &Path) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    if summary.interrupted {
        out.push_str("Interrupted. ");
    }
    let _ = writeln!(
        out,
        "Downloaded {} of {} files to {}",
        summary.succeeded,
        summary.total(),
        destination.display()
    );
    let _ = writeln!(
        out,
        "  succeeded: {}  skipped: {}  failed: {}  cancelled: {}  retried: {}",
        summary.succeeded, summary.skipped, summary.failed, summary.cancelled, summary.retried
    );

    let failures: Vec<_> = report
        .tasks
        .iter()
        .filter(|task| task.status() == TaskStatus::Failed)
        .collect();
    if !failures.is_empty() {
        out.push_str("Failed files:\n");
        for task in failures {
            let _ = writeln!(
                out,
                "  {} ({} attempts): {}",
                task.link().file_name(),
                task.attempts(),
                task.last_error().unwrap_or("unknown error")
            );
        }
    }
    out
}

/// Renders the completion summary as pretty JSON.
pub(crate) fn format_summary_json(report: &JobReport) -> Result<String> {
    let rows = report
        .tasks
        .iter()
        .map(|task| TaskRow {
            url: task.link().as_str(),
            file_name: task.link().file_name(),
            status: task.status(),
            attempts: task.attempts(),
            error: task.last_error(),
        })
        .collect();
    let json = JsonReport {
        summary: report.summary,
        tasks: rows,
    };
    serde_json::to_string_pretty(&json).context("Failed to serialize summary")
}

/// Renders discovered links as a JSON array of URL strings.
pub(crate) fn format_links_json(links: &[FileLink]) -> Result<String> {
    serde_json::to_string_pretty(links).context("Failed to serialize link list")
}

pub(crate) fn print_summary(report: &JobReport, destination: &Path, json: bool) -> Result<()> {
    if json {
        println!("{}", format_summary_json(report)?);
    } else {
        print!("{}", format_summary(report, destination));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn empty_report(summary: JobSummary) -> JobReport {
        JobReport {
            summary,
            tasks: Vec::new(),
        }
    }

    #[test]
    fn test_format_summary_counts() {
        let report = empty_report(JobSummary {
            succeeded: 3,
            skipped: 1,
            failed: 0,
            cancelled: 0,
            retried: 2,
            interrupted: false,
        });
        let text = format_summary(&report, Path::new("/tmp/out"));
        assert!(text.starts_with("Downloaded 3 of 4 files to /tmp/out"));
        assert!(text.contains("skipped: 1"));
        assert!(text.contains("retried: 2"));
        assert!(!text.contains("Failed files"));
    }

    #[test]
    fn test_format_summary_marks_interrupted_run() {
        let report = empty_report(JobSummary {
            cancelled: 8,
            interrupted: true,
            ..JobSummary::default()
        });
        assert!(format_summary(&report, Path::new("out")).starts_with("Interrupted. "));
    }

    #[test]
    fn test_summary_json_flattens_counts() {
        let report = empty_report(JobSummary {
            succeeded: 2,
            ..JobSummary::default()
        });
        let value: serde_json::Value =
            serde_json::from_str(&format_summary_json(&report).unwrap()).unwrap();
        assert_eq!(value["succeeded"], 2);
        assert_eq!(value["interrupted"], false);
        assert!(value["tasks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_links_json_is_array_of_urls() {
        let links = vec![
            FileLink::parse("https://archive.org/download/x/a.mp3").unwrap(),
            FileLink::parse("https://archive.org/download/x/b.ogg").unwrap(),
        ];
        let value: serde_json::Value =
            serde_json::from_str(&format_links_json(&links).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                "https://archive.org/download/x/a.mp3",
                "https://archive.org/download/x/b.ogg"
            ])
        );
    }
}
