//! Sequential upload of one buffer to several destinations.
//!
//! Each destination runs the start / transfer / finish session protocol on
//! its own. A failure is recorded for that destination and the uploader
//! moves on; destinations are never retried.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use mediarelay_core::{
    CredentialStorePort, DestinationClientPort, DestinationCredential, DestinationError,
    DestinationId, DestinationResult, ProgressSinkPort, SourceId, ThrottleWindow,
    TransferDirection, TransferProgress, UploadMetadata, UploadSession,
};

use crate::progress::{self, ProgressThrottle, RateMeter};
use crate::transfer::ChunkCursor;

/// Uploads a payload to each destination of a job, in order.
#[derive(Clone)]
pub struct MultiDestinationUploader {
    client: Arc<dyn DestinationClientPort>,
    credentials: Arc<dyn CredentialStorePort>,
    sink: Arc<dyn ProgressSinkPort>,
    chunk_size: usize,
    window: ThrottleWindow,
}

impl MultiDestinationUploader {
    /// Create an uploader.
    pub fn new(
        client: Arc<dyn DestinationClientPort>,
        credentials: Arc<dyn CredentialStorePort>,
        sink: Arc<dyn ProgressSinkPort>,
        chunk_size: usize,
        window: ThrottleWindow,
    ) -> Self {
        Self {
            client,
            credentials,
            sink,
            chunk_size,
            window,
        }
    }

    /// Upload `payload` to every destination.
    ///
    /// Returns exactly one result per destination, in the same order. Once
    /// `cancel` fires, the destination in flight and all remaining ones are
    /// recorded as cancelled.
    pub async fn upload(
        &self,
        job: &SourceId,
        payload: &Bytes,
        destinations: &[DestinationId],
        metadata: &UploadMetadata,
        cancel: &CancellationToken,
    ) -> Vec<DestinationResult> {
        let mut results = Vec::with_capacity(destinations.len());

        for destination in destinations {
            let attempt = if cancel.is_cancelled() {
                Err(DestinationError::Cancelled)
            } else {
                self.upload_one(job, payload, destination, metadata, cancel)
                    .await
            };

            match attempt {
                Ok(artifact_id) => {
                    tracing::info!(
                        job = %job,
                        destination = %destination,
                        artifact_id = %artifact_id,
                        "Upload complete"
                    );
                    results.push(DestinationResult::succeeded(
                        destination.clone(),
                        artifact_id,
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        job = %job,
                        destination = %destination,
                        error = %e,
                        "Upload failed"
                    );
                    results.push(DestinationResult::failed(destination.clone(), &e));
                }
            }
        }

        results
    }

    async fn upload_one(
        &self,
        job: &SourceId,
        payload: &Bytes,
        destination: &DestinationId,
        metadata: &UploadMetadata,
        cancel: &CancellationToken,
    ) -> Result<String, DestinationError> {
        let credential = self.credentials.credential(destination).await?;
        let label = credential.display_label();
        let total = payload.len() as u64;

        let session = self.client.start(&credential, total).await?;
        tracing::debug!(
            job = %job,
            destination = %destination,
            session = %session.session_id,
            total,
            "Upload session started"
        );

        let mut throttle = ProgressThrottle::from_window(self.window);
        let rate = RateMeter::start();

        for span in ChunkCursor::new(payload.len(), self.chunk_size) {
            if cancel.is_cancelled() {
                return Err(DestinationError::Cancelled);
            }
            let chunk = payload.slice(span.range());
            self.client
                .transfer(&credential, &session, span.offset, chunk)
                .await?;

            let now = Instant::now();
            let percent = TransferProgress::percent_of(span.end(), total);
            if throttle.should_emit(percent, now) {
                let update = TransferProgress {
                    job: job.to_string(),
                    direction: TransferDirection::Upload,
                    percent,
                    bytes_transferred: span.end(),
                    total_bytes: total,
                    rate_bytes_per_second: rate.rate(span.end(), now),
                    destination_label: Some(label.clone()),
                };
                progress::deliver(self.sink.as_ref(), &update).await;
            }
        }

        if cancel.is_cancelled() {
            return Err(DestinationError::Cancelled);
        }
        self.finish(&credential, &session, metadata).await
    }

    /// Finish the session, retrying once without the thumbnail if the
    /// destination rejected the thumbnail itself. Any other finish failure
    /// is terminal for the destination.
    async fn finish(
        &self,
        credential: &DestinationCredential,
        session: &UploadSession,
        metadata: &UploadMetadata,
    ) -> Result<String, DestinationError> {
        match self.client.finish(credential, session, metadata).await {
            Ok(artifact_id) => Ok(artifact_id),
            Err(e @ DestinationError::SecondaryArtifact { .. })
                if metadata.thumbnail.is_some() =>
            {
                tracing::warn!(
                    destination = %credential.destination,
                    error = %e,
                    "Thumbnail rejected, retrying finish without it"
                );
                self.client
                    .finish(credential, session, &metadata.without_thumbnail())
                    .await
            }
            Err(e) => Err(e),
        }
    }
}
