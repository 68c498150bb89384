//! In-memory fakes for the engine's ports, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use mediarelay_core::{
    DestinationClientPort, DestinationCredential, DestinationError, DestinationId,
    ProgressSinkPort, RelayEvent, RelayEventEmitterPort, ResolvedSource, SinkError, SourceError,
    SourceFetcherPort, SourceResolverPort, SourceStream, StaticCredentialStore, TransferProgress,
    UploadMetadata, UploadPhase, UploadSession,
};

enum ScriptedSource {
    Fixed {
        declared_len: Option<u64>,
        fragments: Vec<Result<Bytes, SourceError>>,
    },
    Live {
        declared_len: Option<u64>,
        rx: mpsc::UnboundedReceiver<Result<Bytes, SourceError>>,
    },
}

/// Fetcher that serves canned or channel-fed fragment streams by locator.
#[derive(Default)]
pub struct ScriptedFetcher {
    sources: Mutex<HashMap<String, ScriptedSource>>,
    opened: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `fragments` for `locator`. Each open replays the same list.
    pub fn with_source(
        self,
        locator: &str,
        declared_len: Option<u64>,
        fragments: Vec<Result<Bytes, SourceError>>,
    ) -> Self {
        self.sources.lock().unwrap().insert(
            locator.to_string(),
            ScriptedSource::Fixed {
                declared_len,
                fragments,
            },
        );
        self
    }

    /// Serve `locator` from a channel the test feeds. Single use.
    pub fn with_live_source(
        self,
        locator: &str,
        declared_len: Option<u64>,
    ) -> (Self, mpsc::UnboundedSender<Result<Bytes, SourceError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sources.lock().unwrap().insert(
            locator.to_string(),
            ScriptedSource::Live { declared_len, rx },
        );
        (self, tx)
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFetcherPort for ScriptedFetcher {
    async fn open(&self, locator: &str) -> Result<SourceStream, SourceError> {
        self.opened.lock().unwrap().push(locator.to_string());
        let mut sources = self.sources.lock().unwrap();
        match sources.remove(locator) {
            Some(ScriptedSource::Fixed {
                declared_len,
                fragments,
            }) => {
                sources.insert(
                    locator.to_string(),
                    ScriptedSource::Fixed {
                        declared_len,
                        fragments: fragments.clone(),
                    },
                );
                Ok(SourceStream::from_fragments(declared_len, fragments))
            }
            Some(ScriptedSource::Live { declared_len, rx }) => {
                let fragments = stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                })
                .boxed();
                Ok(SourceStream::new(declared_len, fragments))
            }
            None => Err(SourceError::unavailable_with_status(
                format!("no such source: {locator}"),
                404,
            )),
        }
    }
}

/// Resolver that echoes the locator, titled after it, unless told to fail.
#[derive(Default)]
pub struct EchoResolver {
    failing: HashSet<String>,
    thumbnails: HashMap<String, String>,
}

impl EchoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, locator: &str) -> Self {
        self.failing.insert(locator.to_string());
        self
    }

    pub fn with_thumbnail(mut self, locator: &str, thumbnail: &str) -> Self {
        self.thumbnails
            .insert(locator.to_string(), thumbnail.to_string());
        self
    }
}

#[async_trait]
impl SourceResolverPort for EchoResolver {
    async fn resolve(&self, locator: &str) -> Result<ResolvedSource, SourceError> {
        if self.failing.contains(locator) {
            return Err(SourceError::unavailable("resolver refused"));
        }
        let mut source = ResolvedSource::new(locator, format!("Title of {locator}"))
            .with_description("relayed");
        if let Some(thumb) = self.thumbnails.get(locator) {
            source = source.with_thumbnail(thumb.clone());
        }
        Ok(source)
    }
}

/// One recorded destination call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start { destination: String, total: u64 },
    Transfer { destination: String, offset: u64, len: usize },
    Finish { destination: String, thumbnail: bool },
}

/// Holds a destination's first transfer call until the test releases it.
#[derive(Clone, Default)]
pub struct TransferGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl TransferGate {
    /// Wait until the gated transfer call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the gated transfer call return.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Destination client that records calls and fails on demand.
#[derive(Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    failures: HashMap<String, UploadPhase>,
    rejects_thumbnail: HashSet<String>,
    cancels: HashMap<String, CancellationToken>,
    gates: Mutex<HashMap<String, TransferGate>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call of `phase` for `destination`.
    pub fn failing_at(mut self, destination: &str, phase: UploadPhase) -> Self {
        self.failures.insert(destination.to_string(), phase);
        self
    }

    /// Reject finish calls that carry a thumbnail.
    pub fn rejecting_thumbnail(mut self, destination: &str) -> Self {
        self.rejects_thumbnail.insert(destination.to_string());
        self
    }

    /// Fire `token` from inside every transfer call for `destination`.
    pub fn cancelling_on_transfer(mut self, destination: &str, token: CancellationToken) -> Self {
        self.cancels.insert(destination.to_string(), token);
        self
    }

    /// Block the first transfer call for `destination` on the returned gate.
    pub fn with_transfer_gate(self, destination: &str) -> (Self, TransferGate) {
        let gate = TransferGate::default();
        self.gates
            .lock()
            .unwrap()
            .insert(destination.to_string(), gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, destination: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                Call::Start { destination: d, .. }
                | Call::Transfer { destination: d, .. }
                | Call::Finish { destination: d, .. } => d == destination,
            })
            .collect()
    }

    pub fn transfers_for(&self, destination: &str) -> Vec<(u64, usize)> {
        self.calls_for(destination)
            .into_iter()
            .filter_map(|c| match c {
                Call::Transfer { offset, len, .. } => Some((offset, len)),
                _ => None,
            })
            .collect()
    }

    fn fail_if(&self, destination: &str, phase: UploadPhase, offset: u64) -> Result<(), DestinationError> {
        if self.failures.get(destination) == Some(&phase) {
            return Err(DestinationError::session_with_status(
                phase,
                offset,
                "scripted failure",
                500,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DestinationClientPort for RecordingClient {
    async fn start(
        &self,
        credential: &DestinationCredential,
        total_bytes: u64,
    ) -> Result<UploadSession, DestinationError> {
        let destination = credential.destination.to_string();
        self.calls.lock().unwrap().push(Call::Start {
            destination: destination.clone(),
            total: total_bytes,
        });
        self.fail_if(&destination, UploadPhase::Start, 0)?;
        Ok(UploadSession::new(format!("session-{destination}")))
    }

    async fn transfer(
        &self,
        credential: &DestinationCredential,
        _session: &UploadSession,
        offset: u64,
        chunk: Bytes,
    ) -> Result<(), DestinationError> {
        let destination = credential.destination.to_string();
        self.calls.lock().unwrap().push(Call::Transfer {
            destination: destination.clone(),
            offset,
            len: chunk.len(),
        });
        let gate = self.gates.lock().unwrap().remove(&destination);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(token) = self.cancels.get(&destination) {
            token.cancel();
        }
        self.fail_if(&destination, UploadPhase::Transfer, offset)
    }

    async fn finish(
        &self,
        credential: &DestinationCredential,
        session: &UploadSession,
        metadata: &UploadMetadata,
    ) -> Result<String, DestinationError> {
        let destination = credential.destination.to_string();
        let thumbnail = metadata.thumbnail.is_some();
        self.calls.lock().unwrap().push(Call::Finish {
            destination: destination.clone(),
            thumbnail,
        });
        self.fail_if(&destination, UploadPhase::Finish, 0)?;
        if thumbnail && self.rejects_thumbnail.contains(&destination) {
            return Err(DestinationError::secondary_artifact("thumbnail rejected"));
        }
        Ok(format!("artifact-{}", session.session_id))
    }
}

/// Progress sink that records every delivery, optionally rejecting them.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<TransferProgress>>,
    reject: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<TransferProgress> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSinkPort for RecordingSink {
    async fn report(&self, progress: &TransferProgress) -> Result<(), SinkError> {
        self.delivered.lock().unwrap().push(progress.clone());
        if self.reject {
            return Err(SinkError::RateLimited {
                retry_after_ms: Some(1_000),
            });
        }
        Ok(())
    }
}

/// Emitter that records events.
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    events: std::sync::Arc<Mutex<Vec<RelayEvent>>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RelayEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl RelayEventEmitterPort for RecordingEmitter {
    fn emit(&self, event: RelayEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn clone_box(&self) -> Box<dyn RelayEventEmitterPort> {
        Box::new(self.clone())
    }
}

/// Credentials for the given destination ids.
pub fn credentials(ids: &[&str]) -> StaticCredentialStore {
    StaticCredentialStore::new(
        ids.iter()
            .map(|id| {
                DestinationCredential::new(
                    DestinationId::new(*id),
                    format!("Label {id}"),
                    format!("https://{id}.invalid/upload"),
                    format!("token-{id}"),
                )
            })
            .collect(),
    )
}

/// Destination ids from strings.
pub fn destinations(ids: &[&str]) -> Vec<DestinationId> {
    ids.iter().map(|id| DestinationId::new(*id)).collect()
}

/// `count` fragments of `size` bytes, each filled with its index.
pub fn fragments(count: usize, size: usize) -> Vec<Result<Bytes, SourceError>> {
    (0..count)
        .map(|i| Ok(Bytes::from(vec![u8::try_from(i % 256).unwrap(); size])))
        .collect()
}
