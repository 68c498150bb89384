//! Per-destination results and job-level outcomes.

use serde::{Deserialize, Serialize};

use super::errors::{DestinationError, RelayError};
use super::types::{DestinationId, Job, JobStatus};

/// Result of relaying one job to one destination.
///
/// Exactly one of `error_detail` / `remote_artifact_id` is present,
/// depending on `success`. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationResult {
    destination_id: DestinationId,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_artifact_id: Option<String>,
}

impl DestinationResult {
    /// A destination that accepted the upload.
    pub fn succeeded(destination_id: DestinationId, remote_artifact_id: impl Into<String>) -> Self {
        Self {
            destination_id,
            success: true,
            error_detail: None,
            remote_artifact_id: Some(remote_artifact_id.into()),
        }
    }

    /// A destination that failed.
    pub fn failed(destination_id: DestinationId, error: &DestinationError) -> Self {
        Self {
            destination_id,
            success: false,
            error_detail: Some(error.to_string()),
            remote_artifact_id: None,
        }
    }

    /// The destination this result belongs to.
    #[must_use]
    pub const fn destination_id(&self) -> &DestinationId {
        &self.destination_id
    }

    /// Whether the upload succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Failure description (failed results only).
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    /// Identifier the destination assigned to the uploaded artifact (successful results only).
    #[must_use]
    pub fn remote_artifact_id(&self) -> Option<&str> {
        self.remote_artifact_id.as_deref()
    }
}

/// Final outcome of one job.
///
/// Always carries the per-destination breakdown; it is empty only when the
/// job failed before any destination was attempted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobOutcome {
    /// At least one destination succeeded.
    Completed {
        /// Per-destination results, in destination order.
        results: Vec<DestinationResult>,
    },
    /// The job failed as a whole.
    Failed {
        /// Why the job failed.
        error: RelayError,
        /// Per-destination results, in destination order.
        results: Vec<DestinationResult>,
    },
}

impl JobOutcome {
    /// Aggregate destination results: success if at least one destination succeeded.
    #[must_use]
    pub fn from_results(results: Vec<DestinationResult>) -> Self {
        if results.iter().any(DestinationResult::is_success) {
            Self::Completed { results }
        } else {
            Self::Failed {
                error: RelayError::AllDestinationsFailed {
                    failed: results.len(),
                },
                results,
            }
        }
    }

    /// A job-level failure with no destination attempted.
    #[must_use]
    pub const fn failed(error: RelayError) -> Self {
        Self::Failed {
            error,
            results: Vec::new(),
        }
    }

    /// Terminal job status for this outcome.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        match self {
            Self::Completed { .. } => JobStatus::Completed,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }

    /// Per-destination breakdown.
    #[must_use]
    pub fn results(&self) -> &[DestinationResult] {
        match self {
            Self::Completed { results } | Self::Failed { results, .. } => results,
        }
    }

    /// Job-level error, if the job failed.
    #[must_use]
    pub const fn error(&self) -> Option<&RelayError> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// Whether the job ended because the operator cancelled it.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                error: RelayError::Cancelled,
                ..
            }
        )
    }

    /// Number of destinations that succeeded.
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.results().iter().filter(|r| r.is_success()).count()
    }
}

/// A finished job together with its outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    /// The job, with its terminal status.
    pub job: Job,
    /// What happened.
    pub outcome: JobOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::errors::UploadPhase;

    fn ok(id: &str) -> DestinationResult {
        DestinationResult::succeeded(DestinationId::new(id), format!("artifact-{id}"))
    }

    fn failed(id: &str) -> DestinationResult {
        DestinationResult::failed(
            DestinationId::new(id),
            &DestinationError::session(UploadPhase::Transfer, 0, "boom"),
        )
    }

    #[test]
    fn test_result_fields_follow_success() {
        let good = ok("d1");
        assert!(good.is_success());
        assert_eq!(good.remote_artifact_id(), Some("artifact-d1"));
        assert!(good.error_detail().is_none());

        let bad = failed("d2");
        assert!(!bad.is_success());
        assert!(bad.remote_artifact_id().is_none());
        assert!(bad.error_detail().unwrap().contains("boom"));
    }

    #[test]
    fn test_partial_failure_is_completed() {
        let outcome = JobOutcome::from_results(vec![ok("d1"), failed("d2"), ok("d3")]);
        assert_eq!(outcome.status(), JobStatus::Completed);
        assert_eq!(outcome.succeeded_count(), 2);
        assert_eq!(outcome.results().len(), 3);
        assert!(outcome.error().is_none());
    }

    #[test]
    fn test_all_failed_is_failed() {
        let outcome = JobOutcome::from_results(vec![failed("d1"), failed("d2")]);
        assert_eq!(outcome.status(), JobStatus::Failed);
        assert_eq!(
            outcome.error(),
            Some(&RelayError::AllDestinationsFailed { failed: 2 })
        );
    }

    #[test]
    fn test_cancelled_outcome() {
        let outcome = JobOutcome::failed(RelayError::Cancelled);
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.succeeded_count(), 0);
        assert!(outcome.results().is_empty());
    }
}
