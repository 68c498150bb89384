//! Per-transfer state and its cross-task control handle.
//!
//! `TransferState` is owned by the single in-flight download. Other tasks
//! only ever touch it through a `TransferHandle`, which flips the pause flag
//! or the cancellation token and reads published progress. The byte
//! accounting itself is written by the owner alone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use mediarelay_core::RelayError;

/// Progress published through the handle's watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Bytes received so far.
    pub downloaded: u64,
    /// Best known total (0 when unknown).
    pub total: u64,
    /// Monotonically increasing sequence number for change detection.
    pub seq: u64,
}

/// Cloneable control surface for one live transfer.
///
/// Safe to use from any task: pausing and cancelling are signals, not
/// writes to the owner's counters. Pausing only affects the download leg;
/// cancellation covers the whole job.
#[derive(Debug, Clone)]
pub struct TransferHandle {
    paused: Arc<watch::Sender<bool>>,
    progress: Arc<watch::Sender<ProgressUpdate>>,
    cancel: CancellationToken,
    download_done: Arc<AtomicBool>,
}

impl TransferHandle {
    /// Create a handle for a transfer that has not started yet.
    #[must_use]
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        let (progress, _) = watch::channel(ProgressUpdate::default());
        Self {
            paused: Arc::new(paused),
            progress: Arc::new(progress),
            cancel: CancellationToken::new(),
            download_done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Suspend the transfer before its next fragment. Returns `false` if it
    /// was already paused.
    pub fn pause(&self) -> bool {
        !self.paused.send_replace(true)
    }

    /// Let a paused transfer continue. Returns `false` if it was not paused.
    pub fn resume(&self) -> bool {
        self.paused.send_replace(false)
    }

    /// Abort the transfer. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the transfer is currently paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Whether the transfer has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Latest published progress.
    #[must_use]
    pub fn progress(&self) -> ProgressUpdate {
        *self.progress.borrow()
    }

    /// Subscribe to progress changes.
    #[must_use]
    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressUpdate> {
        self.progress.subscribe()
    }

    /// Mark the download leg as over. Clears any pause left behind.
    pub fn finish_download(&self) {
        self.download_done.store(true, Ordering::SeqCst);
        self.paused.send_replace(false);
    }

    /// Whether the download leg is still running (or has not started).
    #[must_use]
    pub fn is_downloading(&self) -> bool {
        !self.download_done.load(Ordering::SeqCst)
    }

    /// The cancellation token shared by every leg of the job.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Default for TransferHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable state of one inbound download.
///
/// `downloaded_bytes` only grows, and the buffered chunks concatenated in
/// order are exactly the bytes received.
#[derive(Debug)]
pub struct TransferState {
    total_bytes: u64,
    downloaded_bytes: u64,
    started_at: Instant,
    chunks: Vec<Bytes>,
    paused_rx: watch::Receiver<bool>,
    handle: TransferHandle,
}

impl TransferState {
    /// Create state with a fresh handle and a provisional total.
    #[must_use]
    pub fn new(provisional_total: u64) -> Self {
        Self::with_handle(TransferHandle::new(), provisional_total)
    }

    /// Create state controlled by an existing handle.
    #[must_use]
    pub fn with_handle(handle: TransferHandle, provisional_total: u64) -> Self {
        let state = Self {
            total_bytes: provisional_total,
            downloaded_bytes: 0,
            started_at: Instant::now(),
            chunks: Vec::new(),
            paused_rx: handle.paused.subscribe(),
            handle,
        };
        state.publish();
        state
    }

    /// A handle controlling this transfer.
    #[must_use]
    pub fn handle(&self) -> TransferHandle {
        self.handle.clone()
    }

    /// Best known total size.
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Bytes received so far.
    #[must_use]
    pub const fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes
    }

    /// When the transfer state was created.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Number of buffered fragments.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the transfer is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.handle.is_paused()
    }

    /// Whether the transfer is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Replace the provisional total with the length the transport declared.
    ///
    /// Returns `true` if the total changed.
    pub fn correct_total(&mut self, declared: u64) -> bool {
        if declared == self.total_bytes {
            return false;
        }
        self.total_bytes = declared;
        self.publish();
        true
    }

    /// Append one fragment and advance the byte count.
    pub fn record_fragment(&mut self, fragment: Bytes) {
        if fragment.is_empty() {
            return;
        }
        self.downloaded_bytes += fragment.len() as u64;
        self.chunks.push(fragment);
        self.publish();
    }

    /// Fail with `Cancelled` if the transfer was cancelled.
    pub fn check_cancelled(&self) -> Result<(), RelayError> {
        if self.is_cancelled() {
            Err(RelayError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Suspend while paused. Wakes on resume or cancel, without polling.
    pub async fn wait_while_paused(&mut self) -> Result<(), RelayError> {
        let mut logged = false;
        loop {
            self.check_cancelled()?;
            if !*self.paused_rx.borrow_and_update() {
                if logged {
                    tracing::debug!(downloaded = self.downloaded_bytes, "Transfer resumed");
                }
                return Ok(());
            }
            if !logged {
                tracing::debug!(downloaded = self.downloaded_bytes, "Transfer paused");
                logged = true;
            }

            tokio::select! {
                biased;

                () = self.handle.cancel.cancelled() => return Err(RelayError::Cancelled),

                changed = self.paused_rx.changed() => {
                    // The handle keeps the sender alive, so this only fails
                    // if the channel is torn down; nothing can pause us then.
                    if changed.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Concatenate and drain the buffered fragments.
    pub fn take_buffer(&mut self) -> Bytes {
        let chunks = std::mem::take(&mut self.chunks);
        if chunks.len() == 1 {
            return chunks.into_iter().next().unwrap_or_default();
        }
        let mut buffer = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in &chunks {
            buffer.extend_from_slice(chunk);
        }
        buffer.freeze()
    }

    fn publish(&self) {
        let downloaded = self.downloaded_bytes;
        let total = self.total_bytes;
        self.handle.progress.send_modify(|p| {
            p.downloaded = downloaded;
            p.total = total;
            p.seq += 1;
        });
    }
}
