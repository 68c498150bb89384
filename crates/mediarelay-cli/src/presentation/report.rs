//! Per-destination breakdown of a finished job.

use mediarelay_core::{JobOutcome, JobReport};

/// Render a job report as printable lines.
#[must_use]
pub fn format_report(report: &JobReport) -> Vec<String> {
    let mut lines = Vec::new();
    let name = report.job.display_name();

    match &report.outcome {
        JobOutcome::Completed { results } => lines.push(format!(
            "✓ Relayed '{name}' to {}/{} destinations",
            report.outcome.succeeded_count(),
            results.len()
        )),
        JobOutcome::Failed { error, .. } => {
            lines.push(format!("✗ Relay of '{name}' failed: {}", error.user_message()));
        }
    }

    for result in report.outcome.results() {
        let line = match (result.remote_artifact_id(), result.error_detail()) {
            (Some(artifact), _) => format!("  ✓ {}: {artifact}", result.destination_id()),
            (None, Some(detail)) => format!("  ✗ {}: {detail}", result.destination_id()),
            (None, None) => format!("  ✗ {}", result.destination_id()),
        };
        lines.push(line);
    }
    lines
}

/// Print a job report to stdout.
pub fn print_report(report: &JobReport) {
    for line in format_report(report) {
        println!("{line}");
    }
}
