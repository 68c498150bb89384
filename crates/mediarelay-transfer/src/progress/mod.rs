//! Progress tracking and throttling.
//!
//! This module handles rate-limiting and rate calculation for transfer
//! progress events, plus best-effort delivery to the progress sink.

mod rate;
mod throttle;

pub use rate::RateMeter;
pub use throttle::ProgressThrottle;

use mediarelay_core::{ProgressSinkPort, SinkError, TransferProgress};

/// Hand one update to the sink. Rejections are logged and dropped.
pub(crate) async fn deliver(sink: &dyn ProgressSinkPort, progress: &TransferProgress) {
    match sink.report(progress).await {
        Ok(()) => {}
        Err(SinkError::RateLimited { retry_after_ms }) => {
            tracing::debug!(
                job = %progress.job,
                percent = progress.percent,
                retry_after_ms,
                "Progress update rate limited by sink"
            );
        }
        Err(e) => {
            tracing::debug!(job = %progress.job, error = %e, "Progress update dropped");
        }
    }
}
