//! Streamed download into an in-memory buffer.
//!
//! The downloader pulls fragments from a `SourceFetcherPort`, appends them
//! to a `TransferState`, and reports throttled progress. It honors pause
//! between fragments and cancellation at every await point.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_util::StreamExt;

use mediarelay_core::{
    ProgressSinkPort, RelayError, ResolvedSource, SourceFetcherPort, SourceId, ThrottleWindow,
    TransferDirection, TransferProgress,
};

use super::state::TransferState;
use crate::progress::{self, ProgressThrottle, RateMeter};

/// Fetches a resolved source and buffers it.
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<dyn SourceFetcherPort>,
    sink: Arc<dyn ProgressSinkPort>,
    window: ThrottleWindow,
}

impl Downloader {
    /// Create a downloader reporting to `sink` with the given cadence.
    pub fn new(
        fetcher: Arc<dyn SourceFetcherPort>,
        sink: Arc<dyn ProgressSinkPort>,
        window: ThrottleWindow,
    ) -> Self {
        Self {
            fetcher,
            sink,
            window,
        }
    }

    /// Download `source` into `state` and return the assembled payload.
    ///
    /// # Errors
    ///
    /// - `SourceUnavailable` if the fetch could not be opened
    /// - `DownloadFailed` if the stream broke after opening
    /// - `Cancelled` if the handle was cancelled
    ///
    /// On error the partial buffer is left in `state` and the stream is
    /// dropped, releasing the connection.
    pub async fn download(
        &self,
        job: &SourceId,
        source: &ResolvedSource,
        state: &mut TransferState,
    ) -> Result<Bytes, RelayError> {
        let cancel = state.handle().cancellation_token();
        state.check_cancelled()?;

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RelayError::Cancelled),
            opened = self.fetcher.open(&source.locator) => opened,
        };
        let opened = opened.map_err(|e| {
            tracing::warn!(job = %job, error = %e, "Failed to open source");
            RelayError::source_unavailable(e.to_string())
        })?;

        if let Some(declared) = opened.declared_len {
            if state.correct_total(declared) {
                tracing::debug!(job = %job, declared, "Corrected total from transport");
            }
        }

        let mut fragments = opened.fragments;
        let mut throttle = ProgressThrottle::from_window(self.window);
        let rate = RateMeter::starting_at(state.started_at());

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!(job = %job, downloaded = state.downloaded_bytes(), "Download cancelled");
                    return Err(RelayError::Cancelled);
                }
                next = fragments.next() => next,
            };

            match next {
                None => break,
                Some(Err(e)) => {
                    tracing::warn!(
                        job = %job,
                        downloaded = state.downloaded_bytes(),
                        error = %e,
                        "Download stream failed"
                    );
                    return Err(RelayError::download_failed(e.to_string()));
                }
                Some(Ok(fragment)) => {
                    state.wait_while_paused().await?;
                    state.record_fragment(fragment);
                    self.report(job, state, &mut throttle, &rate).await;
                }
            }
        }

        let payload = state.take_buffer();
        tracing::info!(
            job = %job,
            bytes = payload.len(),
            elapsed_ms = state.started_at().elapsed().as_millis(),
            "Download complete"
        );
        Ok(payload)
    }

    async fn report(
        &self,
        job: &SourceId,
        state: &TransferState,
        throttle: &mut ProgressThrottle,
        rate: &RateMeter,
    ) {
        let now = Instant::now();
        let done = state.downloaded_bytes();
        let total = state.total_bytes();
        let percent = TransferProgress::percent_of(done, total);
        if !throttle.should_emit(percent, now) {
            return;
        }

        let update = TransferProgress {
            job: job.to_string(),
            direction: TransferDirection::Download,
            percent,
            bytes_transferred: done,
            total_bytes: total,
            rate_bytes_per_second: rate.rate(done, now),
            destination_label: None,
        };
        progress::deliver(self.sink.as_ref(), &update).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use mediarelay_core::SourceError;

    use crate::test_support::{RecordingSink, ScriptedFetcher, fragments};

    fn downloader(fetcher: ScriptedFetcher, sink: Arc<RecordingSink>) -> Downloader {
        Downloader::new(Arc::new(fetcher), sink, ThrottleWindow::DOWNLOAD)
    }

    fn job() -> SourceId {
        SourceId::new("job-1")
    }

    #[tokio::test]
    async fn test_download_assembles_fragments_in_order() {
        let fetcher = ScriptedFetcher::new().with_source("src", Some(12), fragments(3, 4));
        let sink = Arc::new(RecordingSink::new());
        let mut state = TransferState::new(0);

        let payload = downloader(fetcher, sink)
            .download(&job(), &ResolvedSource::new("src", "t"), &mut state)
            .await
            .unwrap();

        assert_eq!(payload.len(), 12);
        assert_eq!(&payload[..4], &[0, 0, 0, 0]);
        assert_eq!(&payload[8..], &[2, 2, 2, 2]);
        assert_eq!(state.total_bytes(), 12);
        assert_eq!(state.downloaded_bytes(), 12);
    }

    #[tokio::test]
    async fn test_declared_length_replaces_provisional_total() {
        let fetcher = ScriptedFetcher::new().with_source("src", Some(8), fragments(2, 4));
        let mut state = TransferState::new(1_000);

        downloader(fetcher, Arc::new(RecordingSink::new()))
            .download(&job(), &ResolvedSource::new("src", "t"), &mut state)
            .await
            .unwrap();

        assert_eq!(state.total_bytes(), 8);
    }

    #[tokio::test]
    async fn test_first_fragment_is_always_reported() {
        let fetcher = ScriptedFetcher::new().with_source("src", Some(12), fragments(3, 4));
        let sink = Arc::new(RecordingSink::new());
        let mut state = TransferState::new(0);

        downloader(fetcher, Arc::clone(&sink))
            .download(&job(), &ResolvedSource::new("src", "t"), &mut state)
            .await
            .unwrap();

        // Later fragments fall inside the 3 s minimum interval.
        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].direction, TransferDirection::Download);
        assert_eq!(delivered[0].percent, 33);
        assert_eq!(delivered[0].bytes_transferred, 4);
    }

    #[tokio::test]
    async fn test_sink_rejection_does_not_fail_download() {
        let fetcher = ScriptedFetcher::new().with_source("src", None, fragments(2, 4));
        let sink = Arc::new(RecordingSink::rejecting());
        let mut state = TransferState::new(0);

        let payload = downloader(fetcher, Arc::clone(&sink))
            .download(&job(), &ResolvedSource::new("src", "t"), &mut state)
            .await
            .unwrap();

        assert_eq!(payload.len(), 8);
        assert!(!sink.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_is_source_unavailable() {
        let mut state = TransferState::new(0);
        let err = downloader(ScriptedFetcher::new(), Arc::new(RecordingSink::new()))
            .download(&job(), &ResolvedSource::new("missing", "t"), &mut state)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_stream_error_is_download_failed() {
        let mut frags = fragments(1, 4);
        frags.push(Err(SourceError::stream("connection reset")));
        let fetcher = ScriptedFetcher::new().with_source("src", Some(100), frags);
        let mut state = TransferState::new(0);

        let err = downloader(fetcher, Arc::new(RecordingSink::new()))
            .download(&job(), &ResolvedSource::new("src", "t"), &mut state)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::DownloadFailed { ref cause } if cause.contains("connection reset")));
        assert_eq!(state.downloaded_bytes(), 4);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let fetcher = ScriptedFetcher::new().with_source("src", None, fragments(2, 4));
        let mut state = TransferState::new(0);
        state.handle().cancel();

        let err = downloader(fetcher, Arc::new(RecordingSink::new()))
            .download(&job(), &ResolvedSource::new("src", "t"), &mut state)
            .await
            .unwrap_err();

        assert_eq!(err, RelayError::Cancelled);
    }

    #[tokio::test]
    async fn test_pause_freezes_progress_until_resume() {
        let (fetcher, tx) = ScriptedFetcher::new().with_live_source("src", Some(12));
        let dl = downloader(fetcher, Arc::new(RecordingSink::new()));
        let mut state = TransferState::new(0);
        let handle = state.handle();
        let mut progress = handle.subscribe_progress();

        let task = tokio::spawn(async move {
            let result = dl
                .download(&job(), &ResolvedSource::new("src", "t"), &mut state)
                .await;
            (result, state.downloaded_bytes())
        });

        tx.send(Ok(Bytes::from_static(b"aaaa"))).unwrap();
        progress.wait_for(|p| p.downloaded == 4).await.unwrap();

        handle.pause();
        tx.send(Ok(Bytes::from_static(b"bbbb"))).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(handle.progress().downloaded, 4);

        handle.resume();
        progress.wait_for(|p| p.downloaded == 8).await.unwrap();
        tx.send(Ok(Bytes::from_static(b"cccc"))).unwrap();
        drop(tx);

        let (result, downloaded) = task.await.unwrap();
        assert_eq!(&result.unwrap()[..], b"aaaabbbbcccc");
        assert_eq!(downloaded, 12);
    }

    #[tokio::test]
    async fn test_cancel_while_paused_stops_download() {
        let (fetcher, tx) = ScriptedFetcher::new().with_live_source("src", Some(12));
        let dl = downloader(fetcher, Arc::new(RecordingSink::new()));
        let mut state = TransferState::new(0);
        let handle = state.handle();
        let mut progress = handle.subscribe_progress();

        let task = tokio::spawn(async move {
            dl.download(&job(), &ResolvedSource::new("src", "t"), &mut state)
                .await
        });

        tx.send(Ok(Bytes::from_static(b"aaaa"))).unwrap();
        progress.wait_for(|p| p.downloaded == 4).await.unwrap();
        handle.pause();
        tx.send(Ok(Bytes::from_static(b"bbbb"))).unwrap();
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_millis(200), task)
            .await
            .expect("cancel must end the download promptly")
            .unwrap();
        assert_eq!(result, Err(RelayError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_fragment() {
        let (fetcher, _tx) = ScriptedFetcher::new().with_live_source("src", None);
        let dl = downloader(fetcher, Arc::new(RecordingSink::new()));
        let mut state = TransferState::new(0);
        let handle = state.handle();

        let task = tokio::spawn(async move {
            dl.download(&job(), &ResolvedSource::new("src", "t"), &mut state)
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_millis(200), task)
            .await
            .expect("cancel must interrupt a stalled stream")
            .unwrap();
        assert_eq!(result, Err(RelayError::Cancelled));
    }
}
