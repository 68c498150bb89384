//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Destination credentials (JSON file)
//! - Relay history (JSON file)
//! - HTTP adapters (via mediarelay-http)
//! - Relay manager (via mediarelay-transfer)
//!
//! Command handlers receive the fully-composed `CliContext`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use mediarelay_core::{DestinationCredential, DestinationId, RelayConfig, StaticCredentialStore};
use mediarelay_http::{DirectUrlResolver, HttpClientConfig, ReqwestSourceFetcher, SessionUploadClient};
use mediarelay_transfer::{RelayManager, RelayManagerDeps, build_relay_manager};

use crate::error::CliError;
use crate::history_file::JsonHistoryStore;
use crate::presentation::{ConsoleProgressSink, LogEventEmitter};

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Destination credentials file.
    pub destinations_file: PathBuf,
    /// Relay history file.
    pub history_file: PathBuf,
    /// HTTP client settings shared by every adapter.
    pub http: HttpClientConfig,
    /// Engine settings.
    pub relay: RelayConfig,
}

impl CliConfig {
    /// Create config with default engine and HTTP settings.
    pub fn new(destinations_file: impl Into<PathBuf>, history_file: impl Into<PathBuf>) -> Self {
        Self {
            destinations_file: destinations_file.into(),
            history_file: history_file.into(),
            http: HttpClientConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// The relay engine.
    pub manager: Arc<RelayManager>,
    /// Every configured destination, sorted by id.
    pub destinations: Vec<DestinationId>,
}

impl CliContext {
    /// Access the relay manager.
    pub const fn manager(&self) -> &Arc<RelayManager> {
        &self.manager
    }

    /// Whether `id` names a configured destination.
    pub fn knows_destination(&self, id: &DestinationId) -> bool {
        self.destinations.contains(id)
    }
}

/// Bootstrap the CLI application.
///
/// Loads credentials and history, builds the HTTP adapters and the relay
/// manager. Every configured destination becomes a default destination.
pub fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let credentials = StaticCredentialStore::new(load_credentials(&config.destinations_file)?);
    let destinations = credentials.destinations();

    let history = JsonHistoryStore::open(&config.history_file).map_err(CliError::from)?;

    let fetcher = ReqwestSourceFetcher::new(&config.http)
        .map_err(|e| CliError::Config(e.to_string()))?;
    let resolver =
        DirectUrlResolver::new(&config.http).map_err(|e| CliError::Config(e.to_string()))?;
    let uploads =
        SessionUploadClient::new(&config.http).map_err(|e| CliError::Config(e.to_string()))?;

    let relay = config
        .relay
        .with_default_destinations(destinations.clone());

    let manager = build_relay_manager(RelayManagerDeps {
        resolver: Arc::new(resolver),
        fetcher: Arc::new(fetcher),
        destinations: Arc::new(uploads),
        credentials: Arc::new(credentials),
        history: Arc::new(history),
        progress_sink: Arc::new(ConsoleProgressSink),
        event_emitter: Arc::new(LogEventEmitter),
        config: relay,
    });

    tracing::debug!(destinations = destinations.len(), "CLI bootstrap complete");
    Ok(CliContext {
        manager,
        destinations,
    })
}

/// Load destination credentials from a JSON array.
///
/// Duplicate ids are rejected rather than silently shadowed.
pub fn load_credentials(path: &Path) -> Result<Vec<DestinationCredential>, CliError> {
    let raw = fs::read(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            CliError::Config(format!(
                "destinations file {} not found (use --destinations-file)",
                path.display()
            ))
        } else {
            CliError::Io(format!("cannot read {}: {e}", path.display()))
        }
    })?;

    let credentials: Vec<DestinationCredential> = serde_json::from_slice(&raw)
        .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;

    let mut seen = std::collections::BTreeSet::new();
    for credential in &credentials {
        if !seen.insert(&credential.destination) {
            return Err(CliError::Config(format!(
                "{}: destination '{}' is listed twice",
                path.display(),
                credential.destination
            )));
        }
    }

    Ok(credentials)
}
