//! Shared fakes for the relay integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use futures_util::stream::{self, StreamExt};

use mediarelay_core::{
    DestinationClientPort, DestinationCredential, DestinationError, DestinationId,
    InMemoryHistoryStore, NoopProgressSink, NoopRelayEmitter, RelayConfig, ResolvedSource,
    SourceError, SourceFetcherPort, SourceResolverPort, SourceStream, StaticCredentialStore,
    UploadMetadata, UploadPhase, UploadSession,
};
use mediarelay_transfer::{RelayManager, RelayManagerDeps, build_relay_manager};

/// Fetcher serving payloads split into fixed-size fragments.
#[derive(Default)]
pub struct FragmentFetcher {
    payloads: HashMap<String, (Bytes, usize)>,
    live: Mutex<HashMap<String, mpsc::UnboundedReceiver<Bytes>>>,
}

impl FragmentFetcher {
    pub fn with_payload(mut self, locator: &str, payload: Bytes, fragment_len: usize) -> Self {
        self.payloads
            .insert(locator.to_string(), (payload, fragment_len));
        self
    }

    pub fn with_live(self, locator: &str) -> (Self, mpsc::UnboundedSender<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.live.lock().unwrap().insert(locator.to_string(), rx);
        (self, tx)
    }
}

#[async_trait]
impl SourceFetcherPort for FragmentFetcher {
    async fn open(&self, locator: &str) -> Result<SourceStream, SourceError> {
        if let Some(rx) = self.live.lock().unwrap().remove(locator) {
            let fragments = stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|b| (Ok(b), rx))
            })
            .boxed();
            return Ok(SourceStream::new(None, fragments));
        }

        let (payload, fragment_len) = self
            .payloads
            .get(locator)
            .ok_or_else(|| SourceError::unavailable_with_status("not found", 404))?;
        let fragments = payload
            .chunks(*fragment_len)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(SourceStream::from_fragments(
            Some(payload.len() as u64),
            fragments,
        ))
    }
}

/// Resolver that passes the locator through.
pub struct PassthroughResolver;

#[async_trait]
impl SourceResolverPort for PassthroughResolver {
    async fn resolve(&self, locator: &str) -> Result<ResolvedSource, SourceError> {
        Ok(ResolvedSource::new(locator, format!("Clip {locator}")))
    }
}

/// Destination client that reassembles uploads per destination.
#[derive(Default)]
pub struct AssemblingClient {
    received: Mutex<HashMap<String, Vec<(u64, Bytes)>>>,
    finished: Mutex<Vec<String>>,
    failing_transfer: HashSet<String>,
}

impl AssemblingClient {
    pub fn failing_transfer(mut self, destination: &str) -> Self {
        self.failing_transfer.insert(destination.to_string());
        self
    }

    /// (offset, len) of every chunk a destination received.
    pub fn chunks(&self, destination: &str) -> Vec<(u64, usize)> {
        self.received
            .lock()
            .unwrap()
            .get(destination)
            .map(|v| v.iter().map(|(o, b)| (*o, b.len())).collect())
            .unwrap_or_default()
    }

    /// The bytes a destination received, concatenated.
    pub fn assembled(&self, destination: &str) -> Vec<u8> {
        self.received
            .lock()
            .unwrap()
            .get(destination)
            .map(|v| v.iter().flat_map(|(_, b)| b.iter().copied()).collect())
            .unwrap_or_default()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationClientPort for AssemblingClient {
    async fn start(
        &self,
        credential: &DestinationCredential,
        _total_bytes: u64,
    ) -> Result<UploadSession, DestinationError> {
        Ok(UploadSession::new(format!("s-{}", credential.destination)))
    }

    async fn transfer(
        &self,
        credential: &DestinationCredential,
        _session: &UploadSession,
        offset: u64,
        chunk: Bytes,
    ) -> Result<(), DestinationError> {
        let destination = credential.destination.to_string();
        self.received
            .lock()
            .unwrap()
            .entry(destination.clone())
            .or_default()
            .push((offset, chunk));
        if self.failing_transfer.contains(&destination) {
            return Err(DestinationError::session_with_status(
                UploadPhase::Transfer,
                offset,
                "upstream rejected chunk",
                502,
            ));
        }
        Ok(())
    }

    async fn finish(
        &self,
        credential: &DestinationCredential,
        session: &UploadSession,
        _metadata: &UploadMetadata,
    ) -> Result<String, DestinationError> {
        self.finished
            .lock()
            .unwrap()
            .push(credential.destination.to_string());
        Ok(format!("video-{}", session.session_id))
    }
}

pub fn destination_ids(ids: &[&str]) -> Vec<DestinationId> {
    ids.iter().map(|id| DestinationId::new(*id)).collect()
}

/// A manager wired to the given fakes, with no delay between jobs.
pub fn manager(fetcher: FragmentFetcher, client: Arc<AssemblingClient>) -> Arc<RelayManager> {
    let credentials = StaticCredentialStore::new(
        ["d1", "d2", "d3"]
            .iter()
            .map(|id| {
                DestinationCredential::new(
                    DestinationId::new(*id),
                    *id,
                    format!("https://{id}.invalid"),
                    "secret",
                )
            })
            .collect(),
    );
    build_relay_manager(RelayManagerDeps {
        resolver: Arc::new(PassthroughResolver),
        fetcher: Arc::new(fetcher),
        destinations: client,
        credentials: Arc::new(credentials),
        history: Arc::new(InMemoryHistoryStore::new()),
        progress_sink: Arc::new(NoopProgressSink),
        event_emitter: Arc::new(NoopRelayEmitter::new()),
        config: RelayConfig::default().with_advance_delay_ms(0),
    })
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Bytes {
    (0..len)
        .map(|i| u8::try_from(i % 251).unwrap())
        .collect::<Vec<u8>>()
        .into()
}
