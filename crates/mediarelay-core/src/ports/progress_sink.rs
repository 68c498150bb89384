//! Progress sink port.
//!
//! The presentation layer behind this port may rate-limit or reject
//! deliveries. Rejections are lost UI updates, never transfer failures.

use async_trait::async_trait;
use thiserror::Error;

use crate::relay::TransferProgress;

/// Why a progress update could not be delivered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The sink's own rate limit rejected the update.
    #[error("Progress sink rate limited")]
    RateLimited {
        /// Suggested wait before the next update, if the sink provided one.
        retry_after_ms: Option<u64>,
    },

    /// Any other delivery failure.
    #[error("Progress delivery failed: {0}")]
    Delivery(String),
}

/// Port for delivering progress updates.
#[async_trait]
pub trait ProgressSinkPort: Send + Sync {
    /// Deliver one progress update. Best effort.
    async fn report(&self, progress: &TransferProgress) -> Result<(), SinkError>;
}

/// A sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressSink;

#[async_trait]
impl ProgressSinkPort for NoopProgressSink {
    async fn report(&self, _progress: &TransferProgress) -> Result<(), SinkError> {
        Ok(())
    }
}
