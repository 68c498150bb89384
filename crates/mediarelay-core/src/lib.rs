//! Core domain types and ports for mediarelay.
//!
//! - `relay` - jobs, results, events, and the error taxonomy
//! - `ports` - traits for sources, destinations, history, and progress sinks
//! - `config` - engine configuration

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod ports;
pub mod relay;

// Re-export commonly used types for convenience
pub use config::{RelayConfig, ThrottleWindow, UPLOAD_CHUNK_SIZE};
pub use ports::{
    CredentialStorePort, DestinationClientPort, DestinationCredential, FragmentStream,
    HistoryError, HistoryStorePort, InMemoryHistoryStore, NoopProgressSink, NoopRelayEmitter,
    ProgressSinkPort, RelayEventEmitterPort, ResolvedSource, SinkError, SourceError,
    SourceFetcherPort, SourceResolverPort, SourceStream, StaticCredentialStore, UploadSession,
};
pub use relay::{
    DestinationError, DestinationId, DestinationResult, Job, JobOutcome, JobReport, JobStatus,
    QueueSnapshot, QueuedJobSummary, RelayError, RelayEvent, RelayResult, SourceId,
    TransferDirection, TransferProgress, UploadMetadata, UploadPhase,
};
