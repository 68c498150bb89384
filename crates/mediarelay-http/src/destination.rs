//! Session upload client.
//!
//! Speaks the 3-phase protocol as multipart POSTs to the credential's
//! endpoint, authenticated with the bearer token:
//!
//! | phase      | form fields                                                     |
//! |------------|-----------------------------------------------------------------|
//! | `start`    | `upload_phase`, `file_size`                                     |
//! | `transfer` | `upload_phase`, `upload_session_id`, `start_offset`, `file_chunk` |
//! | `finish`   | `upload_phase`, `upload_session_id`, `title`, `description`, `thumb`? |
//!
//! Every response is JSON. A finish refused with 413/415, or with 400/422
//! naming the thumbnail, is reported as a secondary-artifact rejection so
//! the caller can finish again without it.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use mediarelay_core::{
    DestinationClientPort, DestinationCredential, DestinationError, UploadMetadata, UploadPhase,
    UploadSession,
};

use crate::config::HttpClientConfig;
use crate::error::{HttpAdapterError, HttpResult, check_status};

#[derive(Debug, Deserialize)]
struct StartResponse {
    upload_session_id: String,
    #[serde(default)]
    artifact_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinishResponse {
    #[serde(default)]
    artifact_id: Option<String>,
    #[serde(default = "default_success")]
    success: bool,
}

const fn default_success() -> bool {
    true
}

/// Destination client for the chunked session protocol.
#[derive(Debug, Clone)]
pub struct SessionUploadClient {
    client: reqwest::Client,
}

impl SessionUploadClient {
    /// Create a client from configuration.
    pub fn new(config: &HttpClientConfig) -> HttpResult<Self> {
        Ok(Self {
            client: config.build_client()?,
        })
    }

    /// Create a client around an existing reqwest client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        credential: &DestinationCredential,
        form: Form,
    ) -> HttpResult<T> {
        let response = self
            .client
            .post(&credential.endpoint)
            .bearer_auth(credential.token())
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| HttpAdapterError::InvalidResponse {
            message: e.to_string(),
        })
    }
}

fn phase_form(phase: UploadPhase) -> Form {
    Form::new().text("upload_phase", phase.as_str())
}

fn binary_part(data: Bytes, file_name: &'static str) -> Part {
    let len = data.len() as u64;
    Part::stream_with_length(reqwest::Body::from(data), len).file_name(file_name)
}

#[async_trait]
impl DestinationClientPort for SessionUploadClient {
    async fn start(
        &self,
        credential: &DestinationCredential,
        total_bytes: u64,
    ) -> Result<UploadSession, DestinationError> {
        let form = phase_form(UploadPhase::Start).text("file_size", total_bytes.to_string());
        let response: StartResponse = self
            .post(credential, form)
            .await
            .map_err(|e| e.into_session(UploadPhase::Start, 0))?;

        let mut session = UploadSession::new(response.upload_session_id);
        if let Some(artifact_id) = response.artifact_id {
            session = session.with_artifact_id(artifact_id);
        }
        Ok(session)
    }

    async fn transfer(
        &self,
        credential: &DestinationCredential,
        session: &UploadSession,
        offset: u64,
        chunk: Bytes,
    ) -> Result<(), DestinationError> {
        let len = chunk.len();
        let form = phase_form(UploadPhase::Transfer)
            .text("upload_session_id", session.session_id.clone())
            .text("start_offset", offset.to_string())
            .part("file_chunk", binary_part(chunk, "chunk"));

        let _: serde_json::Value = self
            .post(credential, form)
            .await
            .map_err(|e| e.into_session(UploadPhase::Transfer, offset))?;

        tracing::debug!(
            destination = %credential.destination,
            offset,
            bytes = len,
            "Chunk accepted"
        );
        Ok(())
    }

    async fn finish(
        &self,
        credential: &DestinationCredential,
        session: &UploadSession,
        metadata: &UploadMetadata,
    ) -> Result<String, DestinationError> {
        let with_thumbnail = metadata.thumbnail.is_some();
        let mut form = phase_form(UploadPhase::Finish)
            .text("upload_session_id", session.session_id.clone())
            .text("title", metadata.title.clone())
            .text("description", metadata.description.clone());
        if let Some(thumbnail) = &metadata.thumbnail {
            form = form.part("thumb", binary_part(thumbnail.clone(), "thumb.jpg"));
        }

        let response: FinishResponse = self
            .post(credential, form)
            .await
            .map_err(|e| e.into_finish_error(with_thumbnail))?;

        if !response.success {
            return Err(DestinationError::session(
                UploadPhase::Finish,
                0,
                "destination reported an unsuccessful finish",
            ));
        }

        response
            .artifact_id
            .or_else(|| session.artifact_id.clone())
            .ok_or_else(|| {
                DestinationError::session(UploadPhase::Finish, 0, "no artifact id in response")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_response_artifact_is_optional() {
        let with: StartResponse =
            serde_json::from_str(r#"{"upload_session_id":"s1","artifact_id":"v9"}"#).unwrap();
        assert_eq!(with.artifact_id.as_deref(), Some("v9"));

        let without: StartResponse =
            serde_json::from_str(r#"{"upload_session_id":"s1"}"#).unwrap();
        assert!(without.artifact_id.is_none());
    }

    #[test]
    fn test_finish_response_defaults_to_success() {
        let response: FinishResponse = serde_json::from_str("{}").unwrap();
        assert!(response.success);
        assert!(response.artifact_id.is_none());
    }
}
