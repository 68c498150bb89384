//! Relay worker pipeline.
//!
//! This module contains the per-job relay logic, isolated from the queue
//! orchestration. The worker operates on value types and cloned Arc
//! dependencies, with no access to the manager's lock.
//!
//! - Worker receives a `Job` (value type), a `TransferHandle` and `WorkerDeps`
//! - Worker never emits lifecycle events; the manager does
//! - Cancellation is observed through the handle at every await point

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use mediarelay_core::{
    Job, JobOutcome, RelayError, ResolvedSource, SourceFetcherPort, SourceResolverPort,
    UploadMetadata,
};

use crate::transfer::{Downloader, TransferHandle, TransferState};
use crate::upload::MultiDestinationUploader;

/// Largest thumbnail the worker will attach to an upload.
const MAX_THUMBNAIL_BYTES: usize = 2 * 1024 * 1024;

/// Dependencies for the relay worker.
#[derive(Clone)]
pub struct WorkerDeps {
    /// Turns a job locator into a fetchable source.
    pub resolver: Arc<dyn SourceResolverPort>,
    /// Used directly for the thumbnail fetch.
    pub fetcher: Arc<dyn SourceFetcherPort>,
    /// Inbound leg.
    pub downloader: Downloader,
    /// Outbound leg.
    pub uploader: MultiDestinationUploader,
}

/// Resolve the job's locator, honoring cancellation.
pub async fn resolve_source(
    deps: &WorkerDeps,
    job: &Job,
    handle: &TransferHandle,
) -> Result<ResolvedSource, RelayError> {
    let cancel = handle.cancellation_token();
    let resolved = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(RelayError::Cancelled),
        resolved = deps.resolver.resolve(&job.locator) => resolved,
    };

    resolved.map_err(|e| {
        tracing::warn!(job = %job.source_id, locator = %job.locator, error = %e, "Failed to resolve source");
        RelayError::source_unavailable(e.to_string())
    })
}

/// Run a resolved job to completion: download, then upload to every
/// destination.
///
/// Job-level failures (download, cancel before upload) carry no
/// destination results.
pub async fn run_job(
    deps: &WorkerDeps,
    job: &Job,
    source: &ResolvedSource,
    handle: &TransferHandle,
) -> JobOutcome {
    let mut state = TransferState::with_handle(handle.clone(), source.declared_len.unwrap_or(0));
    let downloaded = deps
        .downloader
        .download(&job.source_id, source, &mut state)
        .await;
    drop(state);
    handle.finish_download();
    let payload = match downloaded {
        Ok(payload) => payload,
        Err(e) => return JobOutcome::failed(e),
    };

    if payload.is_empty() {
        return JobOutcome::failed(RelayError::download_failed(
            "source returned an empty payload",
        ));
    }

    let cancel = handle.cancellation_token();
    if cancel.is_cancelled() {
        return JobOutcome::failed(RelayError::Cancelled);
    }

    let mut metadata = UploadMetadata::new(source.title.clone(), source.description.clone());
    if let Some(locator) = &source.thumbnail_locator {
        if let Some(thumbnail) = fetch_thumbnail(deps.fetcher.as_ref(), locator, handle).await {
            metadata = metadata.with_thumbnail(thumbnail);
        }
    }

    let results = deps
        .uploader
        .upload(&job.source_id, &payload, job.destinations(), &metadata, &cancel)
        .await;

    if cancel.is_cancelled() && !results.iter().any(|r| r.is_success()) {
        return JobOutcome::Failed {
            error: RelayError::Cancelled,
            results,
        };
    }
    JobOutcome::from_results(results)
}

/// Best-effort thumbnail fetch. Any failure means no thumbnail.
async fn fetch_thumbnail(
    fetcher: &dyn SourceFetcherPort,
    locator: &str,
    handle: &TransferHandle,
) -> Option<Bytes> {
    let cancel = handle.cancellation_token();
    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return None,
        opened = fetcher.open(locator) => opened,
    };
    let mut stream = match opened {
        Ok(opened) => opened.fragments,
        Err(e) => {
            tracing::warn!(locator, error = %e, "Thumbnail unavailable, uploading without it");
            return None;
        }
    };

    let mut buffer = BytesMut::new();
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            next = stream.next() => next,
        };
        match next {
            None => break,
            Some(Ok(fragment)) => {
                if buffer.len() + fragment.len() > MAX_THUMBNAIL_BYTES {
                    tracing::warn!(locator, "Thumbnail too large, uploading without it");
                    return None;
                }
                buffer.extend_from_slice(&fragment);
            }
            Some(Err(e)) => {
                tracing::warn!(locator, error = %e, "Thumbnail fetch failed, uploading without it");
                return None;
            }
        }
    }

    if buffer.is_empty() {
        None
    } else {
        Some(buffer.freeze())
    }
}
