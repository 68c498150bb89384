//! Destination ports: credentials and the 3-phase session upload.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::relay::{DestinationError, DestinationId, UploadMetadata};

/// Bearer credential and endpoint for one destination.
///
/// Lives only for the duration of one upload call. `Debug` never prints
/// the token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DestinationCredential {
    /// Destination this credential belongs to.
    #[serde(rename = "id")]
    pub destination: DestinationId,
    /// Human-readable destination name for progress output.
    #[serde(default)]
    pub label: String,
    /// Upload endpoint URL.
    pub endpoint: String,
    token: String,
}

impl DestinationCredential {
    /// Create a credential.
    pub fn new(
        destination: DestinationId,
        label: impl Into<String>,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            destination,
            label: label.into(),
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    /// The bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Label, falling back to the destination id.
    #[must_use]
    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            self.destination.to_string()
        } else {
            self.label.clone()
        }
    }
}

impl fmt::Debug for DestinationCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationCredential")
            .field("destination", &self.destination)
            .field("label", &self.label)
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Handle returned by the start phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Session id every later call refers to.
    pub session_id: String,
    /// Artifact id, if the destination assigns one at start.
    pub artifact_id: Option<String>,
}

impl UploadSession {
    /// Create a session handle.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            artifact_id: None,
        }
    }

    /// Set the artifact id assigned at start.
    #[must_use]
    pub fn with_artifact_id(mut self, artifact_id: impl Into<String>) -> Self {
        self.artifact_id = Some(artifact_id.into());
        self
    }
}

/// Port for looking up destination credentials.
#[async_trait]
pub trait CredentialStorePort: Send + Sync {
    /// Credential for a destination.
    async fn credential(
        &self,
        destination: &DestinationId,
    ) -> Result<DestinationCredential, DestinationError>;
}

/// Port for the 3-phase session upload protocol.
///
/// Chunks must be submitted in strictly increasing offset order on one
/// session; implementations may rely on that.
#[async_trait]
pub trait DestinationClientPort: Send + Sync {
    /// Open a session for a payload of `total_bytes`.
    async fn start(
        &self,
        credential: &DestinationCredential,
        total_bytes: u64,
    ) -> Result<UploadSession, DestinationError>;

    /// Submit one chunk at `offset`.
    async fn transfer(
        &self,
        credential: &DestinationCredential,
        session: &UploadSession,
        offset: u64,
        chunk: Bytes,
    ) -> Result<(), DestinationError>;

    /// Complete the session. Returns the remote artifact id.
    async fn finish(
        &self,
        credential: &DestinationCredential,
        session: &UploadSession,
        metadata: &UploadMetadata,
    ) -> Result<String, DestinationError>;
}

/// Credential store backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    credentials: HashMap<DestinationId, DestinationCredential>,
}

impl StaticCredentialStore {
    /// Build from a list of credentials, keyed by destination.
    #[must_use]
    pub fn new(credentials: Vec<DestinationCredential>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .map(|c| (c.destination.clone(), c))
                .collect(),
        }
    }

    /// Known destination ids, sorted.
    #[must_use]
    pub fn destinations(&self) -> Vec<DestinationId> {
        let mut ids: Vec<_> = self.credentials.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl CredentialStorePort for StaticCredentialStore {
    async fn credential(
        &self,
        destination: &DestinationId,
    ) -> Result<DestinationCredential, DestinationError> {
        self.credentials.get(destination).cloned().ok_or_else(|| {
            DestinationError::credentials(destination.as_str(), "no credential configured")
        })
    }
}
