//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define the interfaces that the relay engine expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `reqwest` types in any signature
//! - Network-facing ports are async; the history port is sync because the
//!   queue consults it inline
//! - Adapter errors are port-owned enums, mapped to `RelayError` by the engine

pub mod destination;
pub mod event_emitter;
pub mod history;
pub mod progress_sink;
pub mod source;

pub use destination::{
    CredentialStorePort, DestinationClientPort, DestinationCredential, StaticCredentialStore,
    UploadSession,
};
pub use event_emitter::{NoopRelayEmitter, RelayEventEmitterPort};
pub use history::{HistoryError, HistoryStorePort, InMemoryHistoryStore};
pub use progress_sink::{NoopProgressSink, ProgressSinkPort, SinkError};
pub use source::{
    FragmentStream, ResolvedSource, SourceError, SourceFetcherPort, SourceResolverPort,
    SourceStream,
};
