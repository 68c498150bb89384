//! Relay manager implementation.
//!
//! This module drives the job queue with a long-lived runner and keeps the
//! worker (download + upload) separate from queue bookkeeping.
//!
//! # Architecture
//!
//! - **Manager**: owns the queue, the active transfer and the duplicate
//!   index behind one lock; emits lifecycle events
//! - **Worker**: resolves, downloads and uploads one job; never touches
//!   the lock
//!
//! # Concurrency Model
//!
//! - Single long-lived runner (never resets `runner_started`)
//! - `Notify` for efficient wake-on-work
//! - At most one job processing; the next one starts only after the
//!   previous job has reached a terminal status
//! - The lock is never held across worker I/O

mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify, broadcast};

use mediarelay_core::{
    CredentialStorePort, DestinationClientPort, DestinationId, HistoryStorePort, Job, JobOutcome,
    JobReport, JobStatus, ProgressSinkPort, QueueSnapshot, RelayConfig, RelayError, RelayEvent,
    RelayEventEmitterPort, SourceFetcherPort, SourceId, SourceResolverPort,
};

use crate::history::DuplicateIndex;
use crate::queue::JobQueue;
use crate::transfer::{Downloader, ProgressUpdate, TransferHandle};
use crate::upload::MultiDestinationUploader;

pub use worker::WorkerDeps;

/// Capacity of the job report broadcast channel.
const REPORT_CHANNEL_CAPACITY: usize = 64;

/// Dependencies for building a relay manager.
pub struct RelayManagerDeps {
    /// Locator resolution.
    pub resolver: Arc<dyn SourceResolverPort>,
    /// Streamed fetch of payloads and thumbnails.
    pub fetcher: Arc<dyn SourceFetcherPort>,
    /// Session upload client.
    pub destinations: Arc<dyn DestinationClientPort>,
    /// Destination credentials.
    pub credentials: Arc<dyn CredentialStorePort>,
    /// Previously relayed source ids.
    pub history: Arc<dyn HistoryStorePort>,
    /// Transfer progress output.
    pub progress_sink: Arc<dyn ProgressSinkPort>,
    /// Lifecycle event output.
    pub event_emitter: Arc<dyn RelayEventEmitterPort>,
    /// Engine configuration.
    pub config: RelayConfig,
}

/// Build a relay manager from its dependencies.
pub fn build_relay_manager(deps: RelayManagerDeps) -> Arc<RelayManager> {
    Arc::new(RelayManager::new(deps))
}

/// A request to relay one source item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    /// Deduplication key.
    pub source_id: SourceId,
    /// Locator handed to the resolver.
    pub locator: String,
    /// Explicit destinations; `None` uses the current defaults.
    pub destinations: Option<Vec<DestinationId>>,
}

impl RelayRequest {
    /// Request using the default destinations.
    pub fn new(source_id: SourceId, locator: impl Into<String>) -> Self {
        Self {
            source_id,
            locator: locator.into(),
            destinations: None,
        }
    }

    /// Request with an explicit destination list.
    #[must_use]
    pub fn with_destinations(mut self, destinations: Vec<DestinationId>) -> Self {
        self.destinations = Some(destinations);
        self
    }
}

/// Result of a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// 1-based queue position.
    pub position: u32,
    /// Whether this source was already relayed before. Informational only.
    pub previously_relayed: bool,
}

/// The single in-flight transfer.
struct ActiveTransfer {
    id: SourceId,
    handle: TransferHandle,
}

/// State guarded by the manager's lock.
struct RelayState {
    queue: JobQueue,
    active: Option<ActiveTransfer>,
    duplicates: DuplicateIndex,
    default_destinations: Vec<DestinationId>,
}

impl RelayState {
    fn active_handle(&self, id: &SourceId) -> Option<&TransferHandle> {
        self.active
            .as_ref()
            .filter(|a| &a.id == id)
            .map(|a| &a.handle)
    }
}

/// Orchestrates admission, sequencing and lifecycle reporting of relay jobs.
pub struct RelayManager {
    /// Queue, active transfer and duplicate index.
    state: Mutex<RelayState>,
    /// Cloned into every job.
    worker: WorkerDeps,
    /// Lifecycle events.
    event_emitter: Arc<dyn RelayEventEmitterPort>,
    /// Finished job reports.
    reports: broadcast::Sender<JobReport>,
    /// Pause between a job finishing and the next one starting.
    advance_delay: Duration,
    /// Notifier for waking the runner when work is available.
    queue_notify: Notify,
    /// Whether the runner has been started (never reset for long-lived runner).
    runner_started: AtomicBool,
}

impl RelayManager {
    /// Create a new relay manager.
    pub fn new(deps: RelayManagerDeps) -> Self {
        let config = deps.config;
        let downloader = Downloader::new(
            Arc::clone(&deps.fetcher),
            Arc::clone(&deps.progress_sink),
            config.download_throttle,
        );
        let uploader = MultiDestinationUploader::new(
            deps.destinations,
            deps.credentials,
            deps.progress_sink,
            config.chunk_size,
            config.upload_throttle,
        );
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);

        Self {
            state: Mutex::new(RelayState {
                queue: JobQueue::new(config.max_queue_size),
                active: None,
                duplicates: DuplicateIndex::new(deps.history),
                default_destinations: config.default_destinations.clone(),
            }),
            worker: WorkerDeps {
                resolver: deps.resolver,
                fetcher: deps.fetcher,
                downloader,
                uploader,
            },
            event_emitter: deps.event_emitter,
            reports,
            advance_delay: config.advance_delay(),
            queue_notify: Notify::new(),
            runner_started: AtomicBool::new(false),
        }
    }

    /// Admit a job to the back of the queue.
    ///
    /// A request without destinations gets a copy of the current defaults.
    /// A previously relayed source is still admitted; the admission says so.
    ///
    /// # Errors
    ///
    /// - `AlreadyQueued` if the source is pending or processing
    /// - `InvalidRequest` if the job ends up with no destinations
    /// - `QueueFull` at capacity
    pub async fn admit(&self, request: RelayRequest) -> Result<Admission, RelayError> {
        let RelayRequest {
            source_id,
            locator,
            destinations,
        } = request;

        let admission = {
            let mut state = self.state.lock().await;
            let destinations =
                destinations.unwrap_or_else(|| state.default_destinations.clone());
            let previously_relayed = state.duplicates.contains(&source_id);
            let job = Job::new(source_id.clone(), locator, destinations);
            let position = state.queue.admit(job)?;
            Admission {
                position,
                previously_relayed,
            }
        };

        if admission.previously_relayed {
            tracing::warn!(job = %source_id, "Source was already relayed before; queueing anyway");
        }
        tracing::info!(job = %source_id, position = admission.position, "Relay queued");

        self.queue_notify.notify_one();
        self.emit_queue_snapshot().await;
        Ok(admission)
    }

    /// Admit a job and make sure the runner is draining the queue.
    pub async fn admit_and_process(
        self: &Arc<Self>,
        request: RelayRequest,
    ) -> Result<Admission, RelayError> {
        let admission = self.admit(request).await?;
        self.ensure_runner();
        Ok(admission)
    }

    /// Ensure the runner is started.
    ///
    /// This method is idempotent: calling it multiple times has no effect
    /// after the first call. The runner runs for the lifetime of the manager.
    pub fn ensure_runner(self: &Arc<Self>) {
        if self
            .runner_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                manager.run_loop().await;
            });
        }
    }

    /// The main runner loop.
    async fn run_loop(&self) {
        loop {
            if self.advance().await.is_some() {
                if !self.advance_delay.is_zero() {
                    tokio::time::sleep(self.advance_delay).await;
                }
            } else {
                self.queue_notify.notified().await;
            }
        }
    }

    /// Process the head of the queue, if nothing else is processing.
    ///
    /// Returns the report of the job it ran, or `None` if there was nothing
    /// to start. Safe to call while the runner is active: the queue admits
    /// a single processing job only.
    pub async fn advance(&self) -> Option<JobReport> {
        let (job, handle) = self.next_job().await?;

        tracing::info!(
            job = %job.source_id,
            destinations = job.destinations().len(),
            "Relay started"
        );
        self.event_emitter.emit(RelayEvent::JobStarted {
            id: job.source_id.to_string(),
        });

        let outcome = self.process(&job, &handle).await;
        Some(self.finalize_job(job, outcome).await)
    }

    /// Pause the active download.
    ///
    /// Returns `false` if it was already paused. Uploads cannot be paused;
    /// cancel them instead.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the job is pending or already uploading,
    /// `NotInQueue` if it is not live.
    pub async fn pause(&self, id: &SourceId) -> Result<bool, RelayError> {
        let state = self.state.lock().await;
        let handle = Self::require_downloading(&state, id)?;
        let changed = handle.pause();
        if changed {
            tracing::info!(job = %id, "Relay paused");
        }
        Ok(changed)
    }

    /// Resume a paused download.
    ///
    /// Returns `false` if it was not paused.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the job is pending or already uploading,
    /// `NotInQueue` if it is not live.
    pub async fn resume(&self, id: &SourceId) -> Result<bool, RelayError> {
        let state = self.state.lock().await;
        let handle = Self::require_downloading(&state, id)?;
        let changed = handle.resume();
        if changed {
            tracing::info!(job = %id, "Relay resumed");
        }
        Ok(changed)
    }

    /// Cancel a job.
    ///
    /// The active job is signalled and finishes as cancelled on its own; a
    /// pending job is removed from the queue immediately.
    ///
    /// # Errors
    ///
    /// `NotInQueue` if the job is not live.
    pub async fn cancel(&self, id: &SourceId) -> Result<(), RelayError> {
        let removed = {
            let mut state = self.state.lock().await;
            if let Some(handle) = state.active_handle(id) {
                handle.cancel();
                tracing::info!(job = %id, "Cancelled active relay");
                return Ok(());
            }
            state.queue.remove_pending(id)?
        };

        tracing::info!(job = %id, "Removed relay from queue");
        let mut job = removed;
        job.status = JobStatus::Failed;
        let outcome = JobOutcome::failed(RelayError::Cancelled);
        self.emit_outcome(&job, &outcome);
        self.emit_queue_snapshot().await;
        let _ = self.reports.send(JobReport { job, outcome });
        Ok(())
    }

    /// Snapshot of the live queue.
    pub async fn snapshot(&self) -> QueueSnapshot {
        self.state.lock().await.queue.snapshot()
    }

    /// Byte progress of the active transfer, if `id` is active.
    pub async fn progress(&self, id: &SourceId) -> Option<ProgressUpdate> {
        self.state
            .lock()
            .await
            .active_handle(id)
            .map(TransferHandle::progress)
    }

    /// Whether `id` was relayed before.
    pub async fn is_duplicate(&self, id: &SourceId) -> bool {
        self.state.lock().await.duplicates.contains(id)
    }

    /// Forget every previously relayed id. Returns how many were dropped.
    pub async fn clear_history(&self) -> Result<usize, RelayError> {
        let dropped = self.state.lock().await.duplicates.clear()?;
        tracing::info!(dropped, "Relay history cleared");
        Ok(dropped)
    }

    /// Replace the defaults used for requests without destinations.
    ///
    /// Jobs already admitted keep the list they were admitted with.
    pub async fn set_default_destinations(&self, destinations: Vec<DestinationId>) {
        self.state.lock().await.default_destinations = destinations;
    }

    /// Current default destinations.
    pub async fn default_destinations(&self) -> Vec<DestinationId> {
        self.state.lock().await.default_destinations.clone()
    }

    /// Change the queue capacity. Live jobs beyond it are kept.
    pub async fn set_max_queue_size(&self, size: u32) {
        self.state.lock().await.queue.set_max_size(size);
    }

    /// Subscribe to reports of finished jobs.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<JobReport> {
        self.reports.subscribe()
    }

    // --- Private helpers ---

    /// Promote the next job and register its transfer handle, atomically.
    async fn next_job(&self) -> Option<(Job, TransferHandle)> {
        let next = {
            let mut state = self.state.lock().await;
            let job = state.queue.start_next()?;
            let handle = TransferHandle::new();
            state.active = Some(ActiveTransfer {
                id: job.source_id.clone(),
                handle: handle.clone(),
            });
            (job, handle)
        };

        self.emit_queue_snapshot().await;
        Some(next)
    }

    async fn process(&self, job: &Job, handle: &TransferHandle) -> JobOutcome {
        let source = match worker::resolve_source(&self.worker, job, handle).await {
            Ok(source) => source,
            Err(e) => return JobOutcome::failed(e),
        };

        if !source.title.is_empty() {
            let labelled = self
                .state
                .lock()
                .await
                .queue
                .set_label(&job.source_id, source.title.clone());
            if labelled {
                self.emit_queue_snapshot().await;
            }
        }

        worker::run_job(&self.worker, job, &source, handle).await
    }

    /// Retire the processing job, record history and publish the outcome.
    async fn finalize_job(&self, job: Job, outcome: JobOutcome) -> JobReport {
        let finished = {
            let mut state = self.state.lock().await;
            state.active = None;

            let finished = match state.queue.finish(&job.source_id, outcome.status()) {
                Ok(finished) => finished,
                Err(e) => {
                    tracing::warn!(job = %job.source_id, error = %e, "Finished job was not processing");
                    let mut job = job;
                    job.status = outcome.status();
                    job
                }
            };

            if outcome.succeeded_count() > 0 {
                if let Err(e) = state.duplicates.record(&finished.source_id) {
                    tracing::warn!(job = %finished.source_id, error = %e, "Failed to record relay history");
                }
            }
            finished
        };

        match &outcome {
            JobOutcome::Completed { results } => tracing::info!(
                job = %finished.source_id,
                succeeded = outcome.succeeded_count(),
                total = results.len(),
                "Relay completed"
            ),
            JobOutcome::Failed { error, .. } => tracing::warn!(
                job = %finished.source_id,
                error = %error,
                "Relay failed"
            ),
        }

        self.emit_outcome(&finished, &outcome);
        self.emit_queue_snapshot().await;

        let report = JobReport {
            job: finished,
            outcome,
        };
        let _ = self.reports.send(report.clone());
        report
    }

    fn require_active<'a>(
        state: &'a RelayState,
        id: &SourceId,
    ) -> Result<&'a TransferHandle, RelayError> {
        if let Some(handle) = state.active_handle(id) {
            return Ok(handle);
        }
        if state.queue.is_live(id) {
            Err(RelayError::invalid_request(format!(
                "job {id} has not started transferring"
            )))
        } else {
            Err(RelayError::not_in_queue(id.to_string()))
        }
    }

    fn require_downloading<'a>(
        state: &'a RelayState,
        id: &SourceId,
    ) -> Result<&'a TransferHandle, RelayError> {
        let handle = Self::require_active(state, id)?;
        if handle.is_downloading() {
            Ok(handle)
        } else {
            Err(RelayError::invalid_request(format!(
                "job {id} is uploading; only downloads can be paused"
            )))
        }
    }

    fn emit_outcome(&self, job: &Job, outcome: &JobOutcome) {
        let id = job.source_id.to_string();
        let event = match outcome {
            JobOutcome::Completed { results } => RelayEvent::JobCompleted {
                id,
                results: results.clone(),
            },
            JobOutcome::Failed {
                error: RelayError::Cancelled,
                ..
            } => RelayEvent::JobCancelled { id },
            JobOutcome::Failed { error, results } => RelayEvent::JobFailed {
                id,
                error: error.clone(),
                results: results.clone(),
            },
        };
        self.event_emitter.emit(event);
    }

    async fn emit_queue_snapshot(&self) {
        let snapshot = self.snapshot().await;
        self.event_emitter
            .emit(RelayEvent::QueueSnapshot { snapshot });
    }
}
