//! Relay engine for mediarelay.
//!
//! - `transfer` - streamed download into memory with pause/resume/cancel
//! - `upload` - 3-phase session upload to several destinations
//! - `progress` - progress throttling and rate measurement
//! - `queue` - single-flight FIFO job queue
//! - `manager` - the runner tying it all together

#![deny(unused_crate_dependencies)]

// Re-export core types for convenience
pub use mediarelay_core::{
    DestinationResult, Job, JobOutcome, JobReport, JobStatus, QueueSnapshot, RelayConfig,
    RelayError, RelayEvent, SourceId, TransferProgress,
};

mod history;
pub mod progress;
pub mod queue;
pub mod transfer;
pub mod upload;

// Public API - relay manager
mod manager;

pub use history::DuplicateIndex;
pub use manager::{
    Admission, RelayManager, RelayManagerDeps, RelayRequest, WorkerDeps, build_relay_manager,
};
pub use progress::{ProgressThrottle, RateMeter};
pub use queue::JobQueue;
pub use transfer::{ChunkCursor, ChunkSpan, Downloader, ProgressUpdate, TransferHandle, TransferState};
pub use upload::MultiDestinationUploader;

#[cfg(test)]
mod test_support;
