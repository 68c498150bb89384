//! Relay error types.
//!
//! Job-level failures are `RelayError`; they propagate to the queue, which
//! records them and moves on. Destination-level failures are
//! `DestinationError`; the uploader folds them into a `DestinationResult`
//! and never lets them escape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for job-level relay operations.
///
/// Serializable so it can travel inside events and reports without
/// depending on transport error types.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum RelayError {
    /// The source could not be resolved or opened before any bytes arrived.
    #[error("Source unavailable: {message}")]
    SourceUnavailable {
        /// Detailed error message.
        message: String,
    },

    /// The inbound stream broke mid-transfer.
    #[error("Download failed: {cause}")]
    DownloadFailed {
        /// Underlying transport error.
        cause: String,
    },

    /// The operator cancelled the job.
    #[error("Relay cancelled")]
    Cancelled,

    /// A job with the same source id is already pending or processing.
    #[error("Already queued: {id}")]
    AlreadyQueued {
        /// The source id already in the live queue.
        id: String,
    },

    /// The job request was malformed (e.g. no destinations).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
    },

    /// The live queue has reached its capacity.
    #[error("Queue full: maximum {max_size} jobs allowed")]
    QueueFull {
        /// Maximum queue capacity.
        max_size: u32,
    },

    /// The job is not in the live queue.
    #[error("Not in queue: {id}")]
    NotInQueue {
        /// The source id that wasn't found.
        id: String,
    },

    /// Every destination failed.
    #[error("All {failed} destinations failed")]
    AllDestinationsFailed {
        /// Number of destinations attempted.
        failed: usize,
    },

    /// The history store could not be read or written.
    #[error("History store error: {message}")]
    History {
        /// Detailed error message.
        message: String,
    },
}

impl RelayError {
    /// Create a source unavailable error.
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }

    /// Create a download failed error.
    pub fn download_failed(cause: impl Into<String>) -> Self {
        Self::DownloadFailed {
            cause: cause.into(),
        }
    }

    /// Create an already queued error.
    pub fn already_queued(id: impl Into<String>) -> Self {
        Self::AlreadyQueued { id: id.into() }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a queue full error.
    #[must_use]
    pub const fn queue_full(max_size: u32) -> Self {
        Self::QueueFull { max_size }
    }

    /// Create a not in queue error.
    pub fn not_in_queue(id: impl Into<String>) -> Self {
        Self::NotInQueue { id: id.into() }
    }

    /// Create a history store error.
    pub fn history(message: impl Into<String>) -> Self {
        Self::History {
            message: message.into(),
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether re-admitting the same job could succeed.
    ///
    /// Cancellation is deliberately excluded so an operator cancel is never
    /// undone by an automatic retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. }
                | Self::DownloadFailed { .. }
                | Self::AllDestinationsFailed { .. }
        )
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceUnavailable { message } => format!("Could not reach the source: {message}"),
            Self::DownloadFailed { cause } => format!("The download broke off: {cause}"),
            Self::Cancelled => "The relay was cancelled.".to_string(),
            Self::AlreadyQueued { id } => format!("'{id}' is already in the queue."),
            Self::InvalidRequest { message } => message.clone(),
            Self::QueueFull { max_size } => {
                format!("The queue is full (max {max_size} items). Wait for a job to finish.")
            }
            Self::NotInQueue { id } => format!("'{id}' is not in the queue."),
            Self::AllDestinationsFailed { failed } => {
                format!("Upload failed on all {failed} destinations.")
            }
            Self::History { message } => format!("Could not update history: {message}"),
        }
    }
}

/// Convenience result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Phase of the session upload protocol a destination failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    /// Opening the upload session.
    Start,
    /// Submitting payload chunks.
    Transfer,
    /// Completing the session with metadata.
    Finish,
}

impl UploadPhase {
    /// String representation for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Transfer => "transfer",
            Self::Finish => "finish",
        }
    }
}

impl std::fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a single destination.
///
/// Never surfaces past the uploader: it becomes the `error_detail` of that
/// destination's `DestinationResult`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DestinationError {
    /// No usable credential for the destination.
    #[error("Credentials unavailable for {destination}: {message}")]
    Credentials {
        /// Destination that could not be resolved.
        destination: String,
        /// Detailed error message.
        message: String,
    },

    /// One phase of the upload session failed.
    #[error("Upload session failed during {phase} at offset {offset}: {message}")]
    Session {
        /// Phase that failed.
        phase: UploadPhase,
        /// Byte offset reached when the phase failed.
        offset: u64,
        /// Detailed error message.
        message: String,
        /// HTTP status code if available.
        status_code: Option<u16>,
    },

    /// The destination rejected the secondary artifact.
    #[error("Secondary artifact rejected: {message}")]
    SecondaryArtifact {
        /// Detailed error message.
        message: String,
    },

    /// The job was cancelled before this destination finished.
    #[error("cancelled")]
    Cancelled,
}

impl DestinationError {
    /// Create a credentials error.
    pub fn credentials(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Credentials {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create a session error for the given phase.
    pub fn session(phase: UploadPhase, offset: u64, message: impl Into<String>) -> Self {
        Self::Session {
            phase,
            offset,
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a session error carrying an HTTP status code.
    pub fn session_with_status(
        phase: UploadPhase,
        offset: u64,
        message: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::Session {
            phase,
            offset,
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a secondary artifact error.
    pub fn secondary_artifact(message: impl Into<String>) -> Self {
        Self::SecondaryArtifact {
            message: message.into(),
        }
    }

    /// Phase the error belongs to, if any.
    #[must_use]
    pub const fn phase(&self) -> Option<UploadPhase> {
        match self {
            Self::Session { phase, .. } => Some(*phase),
            Self::SecondaryArtifact { .. } => Some(UploadPhase::Finish),
            Self::Credentials { .. } | Self::Cancelled => None,
        }
    }
}
