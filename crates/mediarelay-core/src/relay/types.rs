//! Core domain types for relay jobs.
//!
//! Pure data types with no I/O dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key identifying one source item.
///
/// Two jobs with the same `SourceId` relay the same media item; the key is
/// what the live queue and the duplicate index deduplicate on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new source identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of one upload destination.
///
/// Resolved to a credential and endpoint through `CredentialStorePort`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(String);

impl DestinationId {
    /// Create a new destination identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DestinationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DestinationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Status of a job in the live queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue.
    Pending,
    /// Being downloaded or uploaded right now.
    Processing,
    /// At least one destination succeeded.
    Completed,
    /// The job failed as a whole (source, download, cancel, or every destination).
    Failed,
}

impl JobStatus {
    /// String representation used in logs and persisted snapshots.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the job has left the live queue for good.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One source-to-many-destinations relay task.
///
/// The destination list is copied in at admission time and never changes
/// afterwards, so editing the default destinations cannot affect a job that
/// is already queued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Deduplication key for the source item.
    pub source_id: SourceId,
    /// Fetchable reference handed to the source resolver.
    pub locator: String,
    destinations: Vec<DestinationId>,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Display title, unknown until the source is resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// When the job was admitted.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a pending job.
    pub fn new(
        source_id: SourceId,
        locator: impl Into<String>,
        destinations: Vec<DestinationId>,
    ) -> Self {
        Self {
            source_id,
            locator: locator.into(),
            destinations,
            status: JobStatus::Pending,
            label: None,
            created_at: Utc::now(),
        }
    }

    /// Destinations in upload order.
    #[must_use]
    pub fn destinations(&self) -> &[DestinationId] {
        &self.destinations
    }

    /// Label if resolved, otherwise the source id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.source_id.to_string())
    }
}

/// Metadata submitted with the finish phase of an upload session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadMetadata {
    /// Title shown on the destination.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Optional secondary artifact (e.g. a thumbnail image).
    pub thumbnail: Option<bytes::Bytes>,
}

impl UploadMetadata {
    /// Create metadata without a secondary artifact.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            thumbnail: None,
        }
    }

    /// Attach a secondary artifact.
    #[must_use]
    pub fn with_thumbnail(mut self, thumbnail: bytes::Bytes) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    /// Copy of this metadata with the secondary artifact dropped.
    #[must_use]
    pub fn without_thumbnail(&self) -> Self {
        Self {
            title: self.title.clone(),
            description: self.description.clone(),
            thumbnail: None,
        }
    }
}
