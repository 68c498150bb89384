//! Relay job queue.
//!
//! This module provides a pure state machine for the live job list: one
//! processing slot plus a FIFO of pending jobs. No I/O is performed here;
//! the orchestrator (`RelayManager`) handles I/O and locking.
//!
//! # Position Semantics
//!
//! - Position 1 = currently processing
//! - Position 2+ = waiting in queue
//! - Without a processing job, pending jobs start at position 1

// Queue positions are always well under u32::MAX in practice
#![allow(clippy::cast_possible_truncation)]

use std::collections::VecDeque;

use mediarelay_core::{Job, JobStatus, QueueSnapshot, QueuedJobSummary, RelayError, SourceId};

/// The live job list.
///
/// A job is live while pending or processing; at most one job is
/// processing at any instant. Terminal jobs leave the queue.
#[derive(Debug)]
pub struct JobQueue {
    pending: VecDeque<Job>,
    processing: Option<Job>,
    max_size: u32,
}

impl JobQueue {
    /// Create an empty queue holding at most `max_size` live jobs.
    pub const fn new(max_size: u32) -> Self {
        Self {
            pending: VecDeque::new(),
            processing: None,
            max_size,
        }
    }

    /// Maximum number of live jobs.
    pub const fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Set the maximum number of live jobs. Existing jobs are kept.
    pub const fn set_max_size(&mut self, size: u32) {
        self.max_size = size;
    }

    /// Number of pending jobs.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of live jobs.
    pub fn len(&self) -> usize {
        self.pending.len() + usize::from(self.processing.is_some())
    }

    /// Whether no job is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The processing job, if any.
    pub const fn processing(&self) -> Option<&Job> {
        self.processing.as_ref()
    }

    /// Whether a job with this id is pending or processing.
    pub fn is_live(&self, id: &SourceId) -> bool {
        self.processing.as_ref().is_some_and(|j| &j.source_id == id)
            || self.pending.iter().any(|j| &j.source_id == id)
    }

    /// Append a job to the back of the queue.
    ///
    /// Returns the 1-based position on success.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the job has no destinations
    /// - `AlreadyQueued` if a job with the same id is live
    /// - `QueueFull` at capacity
    pub fn admit(&mut self, mut job: Job) -> Result<u32, RelayError> {
        if job.destinations().is_empty() {
            return Err(RelayError::invalid_request(format!(
                "job {} has no destinations",
                job.source_id
            )));
        }
        self.check_not_live(&job.source_id)?;
        self.check_capacity()?;

        job.status = JobStatus::Pending;
        self.pending.push_back(job);
        Ok(self.len() as u32)
    }

    /// Promote the head of the queue to processing.
    ///
    /// Returns `None` if a job is already processing or nothing is pending.
    pub fn start_next(&mut self) -> Option<Job> {
        if self.processing.is_some() {
            return None;
        }
        let mut job = self.pending.pop_front()?;
        job.status = JobStatus::Processing;
        self.processing = Some(job.clone());
        Some(job)
    }

    /// Record the display label of a live job.
    ///
    /// Returns `false` if the job is not live.
    pub fn set_label(&mut self, id: &SourceId, label: impl Into<String>) -> bool {
        let label = label.into();
        if let Some(job) = self.find_mut(id) {
            job.label = Some(label);
            true
        } else {
            false
        }
    }

    /// Retire the processing job with a terminal status.
    ///
    /// # Errors
    ///
    /// `NotInQueue` if `id` is not the processing job.
    pub fn finish(&mut self, id: &SourceId, status: JobStatus) -> Result<Job, RelayError> {
        debug_assert!(status.is_terminal());
        match self.processing.take() {
            Some(mut job) if &job.source_id == id => {
                job.status = status;
                Ok(job)
            }
            other => {
                self.processing = other;
                Err(RelayError::not_in_queue(id.to_string()))
            }
        }
    }

    /// Remove a pending job.
    ///
    /// # Errors
    ///
    /// `NotInQueue` if no pending job has this id.
    pub fn remove_pending(&mut self, id: &SourceId) -> Result<Job, RelayError> {
        let idx = self
            .pending
            .iter()
            .position(|j| &j.source_id == id)
            .ok_or_else(|| RelayError::not_in_queue(id.to_string()))?;
        self.pending
            .remove(idx)
            .ok_or_else(|| RelayError::not_in_queue(id.to_string()))
    }

    /// Drop every pending job. Returns how many were removed.
    pub fn clear_pending(&mut self) -> usize {
        let removed = self.pending.len();
        self.pending.clear();
        removed
    }

    /// Snapshot of the live jobs with their positions.
    pub fn snapshot(&self) -> QueueSnapshot {
        let items = self
            .processing
            .iter()
            .chain(self.pending.iter())
            .enumerate()
            .map(|(idx, job)| QueuedJobSummary::from_job(job, idx as u32 + 1))
            .collect();

        QueueSnapshot {
            items,
            max_size: self.max_size,
        }
    }

    // --- Private helpers ---

    fn find_mut(&mut self, id: &SourceId) -> Option<&mut Job> {
        self.processing
            .as_mut()
            .filter(|j| &j.source_id == id)
            .or_else(|| self.pending.iter_mut().find(|j| &j.source_id == id))
    }

    fn check_not_live(&self, id: &SourceId) -> Result<(), RelayError> {
        if self.is_live(id) {
            Err(RelayError::already_queued(id.to_string()))
        } else {
            Ok(())
        }
    }

    fn check_capacity(&self) -> Result<(), RelayError> {
        if self.len() >= self.max_size as usize {
            Err(RelayError::queue_full(self.max_size))
        } else {
            Ok(())
        }
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(mediarelay_core::config::DEFAULT_MAX_QUEUE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediarelay_core::DestinationId;

    fn job(id: &str) -> Job {
        Job::new(
            SourceId::new(id),
            format!("https://media.invalid/{id}"),
            vec![DestinationId::new("dest")],
        )
    }

    fn id(s: &str) -> SourceId {
        SourceId::new(s)
    }

    #[test]
    fn test_admit_returns_positions() {
        let mut queue = JobQueue::new(10);
        assert_eq!(queue.admit(job("a")).unwrap(), 1);
        assert_eq!(queue.admit(job("b")).unwrap(), 2);

        queue.start_next().unwrap();
        assert_eq!(queue.admit(job("c")).unwrap(), 3);
    }

    #[test]
    fn test_admit_rejects_live_duplicate() {
        let mut queue = JobQueue::new(10);
        queue.admit(job("a")).unwrap();
        assert!(matches!(
            queue.admit(job("a")),
            Err(RelayError::AlreadyQueued { .. })
        ));

        // Still rejected while processing.
        queue.start_next().unwrap();
        assert!(matches!(
            queue.admit(job("a")),
            Err(RelayError::AlreadyQueued { .. })
        ));

        // Accepted again once terminal.
        queue.finish(&id("a"), JobStatus::Completed).unwrap();
        assert!(queue.admit(job("a")).is_ok());
    }

    #[test]
    fn test_admit_rejects_empty_destinations() {
        let mut queue = JobQueue::new(10);
        let empty = Job::new(id("a"), "loc", Vec::new());
        assert!(matches!(
            queue.admit(empty),
            Err(RelayError::InvalidRequest { .. })
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_admit_respects_capacity() {
        let mut queue = JobQueue::new(2);
        queue.admit(job("a")).unwrap();
        queue.start_next().unwrap();
        queue.admit(job("b")).unwrap();
        assert_eq!(
            queue.admit(job("c")),
            Err(RelayError::QueueFull { max_size: 2 })
        );
    }

    #[test]
    fn test_start_next_is_fifo_and_single_flight() {
        let mut queue = JobQueue::new(10);
        queue.admit(job("a")).unwrap();
        queue.admit(job("b")).unwrap();

        let first = queue.start_next().unwrap();
        assert_eq!(first.source_id, id("a"));
        assert_eq!(first.status, JobStatus::Processing);
        assert!(queue.start_next().is_none());

        queue.finish(&id("a"), JobStatus::Failed).unwrap();
        assert_eq!(queue.start_next().unwrap().source_id, id("b"));
    }

    #[test]
    fn test_start_next_on_empty_queue() {
        let mut queue = JobQueue::new(10);
        assert!(queue.start_next().is_none());
    }

    #[test]
    fn test_finish_requires_processing_job() {
        let mut queue = JobQueue::new(10);
        queue.admit(job("a")).unwrap();
        queue.admit(job("b")).unwrap();
        queue.start_next().unwrap();

        assert!(queue.finish(&id("b"), JobStatus::Completed).is_err());
        assert_eq!(queue.processing().unwrap().source_id, id("a"));

        let done = queue.finish(&id("a"), JobStatus::Completed).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(queue.processing().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_pending() {
        let mut queue = JobQueue::new(10);
        queue.admit(job("a")).unwrap();
        queue.admit(job("b")).unwrap();
        queue.start_next().unwrap();

        assert!(queue.remove_pending(&id("a")).is_err());
        assert_eq!(queue.remove_pending(&id("b")).unwrap().source_id, id("b"));
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn test_set_label_on_live_jobs_only() {
        let mut queue = JobQueue::new(10);
        queue.admit(job("a")).unwrap();
        assert!(queue.set_label(&id("a"), "A title"));
        assert!(!queue.set_label(&id("zzz"), "nope"));

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.items[0].display_name, "A title");
    }

    #[test]
    fn test_snapshot_positions() {
        let mut queue = JobQueue::new(5);
        queue.admit(job("a")).unwrap();
        queue.admit(job("b")).unwrap();
        queue.admit(job("c")).unwrap();
        queue.start_next().unwrap();

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.max_size, 5);
        let positions: Vec<_> = snapshot
            .items
            .iter()
            .map(|i| (i.id.as_str(), i.position, i.status))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("a", 1, JobStatus::Processing),
                ("b", 2, JobStatus::Pending),
                ("c", 3, JobStatus::Pending),
            ]
        );
    }

    #[test]
    fn test_clear_pending_keeps_processing() {
        let mut queue = JobQueue::new(10);
        queue.admit(job("a")).unwrap();
        queue.admit(job("b")).unwrap();
        queue.start_next().unwrap();

        assert_eq!(queue.clear_pending(), 1);
        assert_eq!(queue.len(), 1);
    }
}
