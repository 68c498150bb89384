//! Progress sink and event emitter for terminal use.

use async_trait::async_trait;
use mediarelay_core::{
    ProgressSinkPort, RelayEvent, RelayEventEmitterPort, SinkError, TransferDirection,
    TransferProgress,
};

/// Prints each surfaced progress update as one line on stderr.
///
/// The engine already throttles updates, so every call prints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleProgressSink;

#[async_trait]
impl ProgressSinkPort for ConsoleProgressSink {
    async fn report(&self, progress: &TransferProgress) -> Result<(), SinkError> {
        eprintln!("{}", format_progress(progress));
        Ok(())
    }
}

/// Forwards lifecycle events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventEmitter;

impl RelayEventEmitterPort for LogEventEmitter {
    fn emit(&self, event: RelayEvent) {
        match event {
            RelayEvent::QueueSnapshot { snapshot } => {
                tracing::debug!(live = snapshot.len(), max = snapshot.max_size, "Queue changed");
            }
            RelayEvent::JobStarted { id } => tracing::info!(job = %id, "Relay started"),
            RelayEvent::JobCompleted { id, results } => {
                let succeeded = results.iter().filter(|r| r.is_success()).count();
                tracing::info!(job = %id, succeeded, total = results.len(), "Relay completed");
            }
            RelayEvent::JobFailed { id, error, .. } => {
                tracing::warn!(job = %id, error = %error, "Relay failed");
            }
            RelayEvent::JobCancelled { id } => tracing::info!(job = %id, "Relay cancelled"),
        }
    }

    fn clone_box(&self) -> Box<dyn RelayEventEmitterPort> {
        Box::new(*self)
    }
}

/// One-line rendering of a progress update.
#[must_use]
pub fn format_progress(progress: &TransferProgress) -> String {
    let leg = match (&progress.direction, &progress.destination_label) {
        (TransferDirection::Download, _) => "download".to_string(),
        (TransferDirection::Upload, Some(label)) => format!("upload to {label}"),
        (TransferDirection::Upload, None) => "upload".to_string(),
    };

    let size = if progress.total_bytes == 0 {
        format_bytes(progress.bytes_transferred)
    } else {
        format!(
            "{} / {}",
            format_bytes(progress.bytes_transferred),
            format_bytes(progress.total_bytes)
        )
    };

    let rate = progress
        .rate_bytes_per_second
        .filter(|r| r.is_finite() && *r > 0.0)
        .map_or_else(String::new, |rate| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let per_second = rate as u64;
            format!("  ({}/s)", format_bytes(per_second))
        });

    format!(
        "[{}] {leg} {:>3}%  {size}{rate}",
        progress.job, progress.percent
    )
}

/// Human-readable byte count (binary units, one decimal).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for &next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}
