//! Relay domain types, events, errors, and outcomes.
//!
//! Pure data types for the relay pipeline. No I/O, networking, or runtime
//! dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Identifiers and the `Job` record
//! - `errors` - Job-level and destination-level error taxonomy
//! - `outcome` - `DestinationResult`, `JobOutcome`, `JobReport`
//! - `events` - Progress payloads, queue snapshots, lifecycle events

pub mod errors;
pub mod events;
pub mod outcome;
pub mod types;

pub use errors::{DestinationError, RelayError, RelayResult, UploadPhase};
pub use events::{QueueSnapshot, QueuedJobSummary, RelayEvent, TransferDirection, TransferProgress};
pub use outcome::{DestinationResult, JobOutcome, JobReport};
pub use types::{DestinationId, Job, JobStatus, SourceId, UploadMetadata};
