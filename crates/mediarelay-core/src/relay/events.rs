//! Relay events and progress payloads.

use serde::{Deserialize, Serialize};

use super::errors::RelayError;
use super::outcome::DestinationResult;
use super::types::{Job, JobStatus};

/// Which leg of the relay a progress event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// Fetching from the source.
    Download,
    /// Pushing to a destination.
    Upload,
}

/// Progress payload delivered to the progress sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferProgress {
    /// Source id of the job.
    pub job: String,
    /// Download or upload leg.
    pub direction: TransferDirection,
    /// Whole-number percentage (0-100).
    pub percent: u8,
    /// Bytes moved so far in this leg.
    pub bytes_transferred: u64,
    /// Total bytes for this leg (0 when unknown).
    pub total_bytes: u64,
    /// Average rate since the leg started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_bytes_per_second: Option<f64>,
    /// Destination label, upload leg only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_label: Option<String>,
}

impl TransferProgress {
    /// Whole-number percentage of `done` over `total`, clamped to 100.
    ///
    /// An unknown total (`0`) reports 0%.
    #[must_use]
    pub fn percent_of(done: u64, total: u64) -> u8 {
        if total == 0 {
            return 0;
        }
        let pct = (u128::from(done) * 100) / u128::from(total);
        u8::try_from(pct.min(100)).unwrap_or(100)
    }
}

/// A job as listed in a queue snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedJobSummary {
    /// Source id.
    pub id: String,
    /// Label or source id.
    pub display_name: String,
    /// Current status.
    pub status: JobStatus,
    /// Position in queue (1 = processing, 2+ = waiting).
    pub position: u32,
    /// Number of destinations the job will upload to.
    pub destination_count: usize,
}

impl QueuedJobSummary {
    /// Summarize a live job at the given position.
    #[must_use]
    pub fn from_job(job: &Job, position: u32) -> Self {
        Self {
            id: job.source_id.to_string(),
            display_name: job.display_name(),
            status: job.status,
            position,
            destination_count: job.destinations().len(),
        }
    }
}

/// Snapshot of the live queue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Processing job first, then pending jobs in FIFO order.
    pub items: Vec<QueuedJobSummary>,
    /// Maximum queue capacity.
    pub max_size: u32,
}

impl QueueSnapshot {
    /// Number of live jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is idle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The job currently processing, if any.
    #[must_use]
    pub fn processing(&self) -> Option<&QueuedJobSummary> {
        self.items
            .iter()
            .find(|item| item.status == JobStatus::Processing)
    }
}

/// Lifecycle events for the relay queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// The live queue changed.
    QueueSnapshot {
        /// New state of the queue.
        snapshot: QueueSnapshot,
    },

    /// A job moved to processing.
    JobStarted {
        /// Source id of the job.
        id: String,
    },

    /// A job finished with at least one successful destination.
    JobCompleted {
        /// Source id of the job.
        id: String,
        /// Per-destination breakdown.
        results: Vec<DestinationResult>,
    },

    /// A job failed.
    JobFailed {
        /// Source id of the job.
        id: String,
        /// Why it failed.
        error: RelayError,
        /// Per-destination breakdown (empty if no destination was attempted).
        results: Vec<DestinationResult>,
    },

    /// A job was cancelled by the operator.
    JobCancelled {
        /// Source id of the job.
        id: String,
    },
}
