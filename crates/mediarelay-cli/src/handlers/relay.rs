//! Relay command handler.
//!
//! Admits one job, lets the manager run it and prints the
//! per-destination breakdown. Ctrl-C cancels the job; the handler still
//! waits for its report.

use std::sync::Arc;

use anyhow::Result;
use mediarelay_core::{DestinationId, JobReport, SourceId};
use mediarelay_transfer::{RelayManager, RelayRequest};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_report;

/// Relay command arguments passed from CLI.
pub struct RelayArgs<'a> {
    pub locator: &'a str,
    pub id: Option<&'a str>,
    pub destinations: &'a [String],
    pub force: bool,
}

/// Execute the relay command.
///
/// A source that was relayed before is skipped unless `force` is set.
///
/// # Errors
///
/// - `CliError::Arguments` for an unknown destination id
/// - `CliError::Relay` if the job failed as a whole
pub async fn execute(ctx: &CliContext, args: RelayArgs<'_>) -> Result<()> {
    let source_id = SourceId::new(args.id.unwrap_or(args.locator));
    let manager = ctx.manager();

    if !args.force && manager.is_duplicate(&source_id).await {
        println!("'{source_id}' was relayed before.");
        println!("Re-run with --force to relay it again.");
        return Ok(());
    }

    let request = build_request(ctx, &source_id, args.locator, args.destinations)?;

    let mut reports = manager.subscribe_reports();
    let admission = manager
        .admit_and_process(request)
        .await
        .map_err(CliError::from)?;
    tracing::debug!(job = %source_id, position = admission.position, "Relay admitted");

    let report = wait_for_report(manager, &mut reports, &source_id).await?;
    print_report(&report);

    match report.outcome.error() {
        None => Ok(()),
        Some(err) => Err(CliError::from(err.clone()).into()),
    }
}

fn build_request(
    ctx: &CliContext,
    source_id: &SourceId,
    locator: &str,
    destinations: &[String],
) -> Result<RelayRequest, CliError> {
    let request = RelayRequest::new(source_id.clone(), locator);
    if destinations.is_empty() {
        return Ok(request);
    }

    let destinations: Vec<DestinationId> = destinations
        .iter()
        .map(|d| DestinationId::new(d.trim()))
        .collect();
    if let Some(unknown) = destinations.iter().find(|d| !ctx.knows_destination(d)) {
        return Err(CliError::Arguments(format!(
            "unknown destination '{unknown}' (not in the destinations file)"
        )));
    }
    Ok(request.with_destinations(destinations))
}

/// Wait for the report of `id`, cancelling the job on the first Ctrl-C.
async fn wait_for_report(
    manager: &Arc<RelayManager>,
    reports: &mut broadcast::Receiver<JobReport>,
    id: &SourceId,
) -> Result<JobReport, CliError> {
    let mut interrupted = false;
    loop {
        tokio::select! {
            received = reports.recv() => match received {
                Ok(report) if report.job.source_id == *id => return Ok(report),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Report receiver lagged");
                }
                Err(RecvError::Closed) => {
                    return Err(CliError::Relay(
                        "relay manager stopped before the job finished".to_string(),
                    ));
                }
            },
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
                    continue;
                }
                eprintln!("Cancelling relay of '{id}'...");
                if let Err(e) = manager.cancel(id).await {
                    tracing::debug!(job = %id, error = %e, "Cancel had no effect");
                }
            }
        }
    }
}
