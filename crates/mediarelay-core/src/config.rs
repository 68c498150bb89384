//! Relay configuration.
//!
//! Plain data with defaults; adapters fill it from flags or environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::relay::DestinationId;

/// Chunk size of the session upload protocol (5 MiB).
pub const UPLOAD_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Default pause between one job finishing and the next one starting.
pub const DEFAULT_ADVANCE_DELAY_MS: u64 = 1_000;

/// Default maximum number of live jobs.
pub const DEFAULT_MAX_QUEUE_SIZE: u32 = 50;

/// Min/max interval pair governing when a progress update is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleWindow {
    /// Never emit more often than this, even if the percentage changed.
    pub min_interval_ms: u64,
    /// Always emit at least this often, even if the percentage did not change.
    pub max_interval_ms: u64,
}

impl ThrottleWindow {
    /// Download cadence: 3 s / 10 s.
    pub const DOWNLOAD: Self = Self {
        min_interval_ms: 3_000,
        max_interval_ms: 10_000,
    };

    /// Upload cadence: 5 s / 15 s. Slower because uploads share one
    /// reporting channel across destinations.
    pub const UPLOAD: Self = Self {
        min_interval_ms: 5_000,
        max_interval_ms: 15_000,
    };

    /// Minimum interval as a `Duration`.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Maximum interval as a `Duration`.
    #[must_use]
    pub const fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }
}

/// Configuration for the relay engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Upload chunk size in bytes.
    pub chunk_size: usize,
    /// Progress cadence while downloading.
    pub download_throttle: ThrottleWindow,
    /// Progress cadence while uploading.
    pub upload_throttle: ThrottleWindow,
    /// Delay before the queue advances to the next job.
    pub advance_delay_ms: u64,
    /// Maximum number of live (pending + processing) jobs.
    pub max_queue_size: u32,
    /// Destinations copied into jobs admitted without an explicit list.
    pub default_destinations: Vec<DestinationId>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chunk_size: UPLOAD_CHUNK_SIZE,
            download_throttle: ThrottleWindow::DOWNLOAD,
            upload_throttle: ThrottleWindow::UPLOAD,
            advance_delay_ms: DEFAULT_ADVANCE_DELAY_MS,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            default_destinations: Vec::new(),
        }
    }
}

impl RelayConfig {
    /// Delay before the queue advances, as a `Duration`.
    #[must_use]
    pub const fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    /// Set the default destinations.
    #[must_use]
    pub fn with_default_destinations(mut self, destinations: Vec<DestinationId>) -> Self {
        self.default_destinations = destinations;
        self
    }

    /// Set the advance delay.
    #[must_use]
    pub const fn with_advance_delay_ms(mut self, delay_ms: u64) -> Self {
        self.advance_delay_ms = delay_ms;
        self
    }

    /// Set the maximum queue size.
    #[must_use]
    pub const fn with_max_queue_size(mut self, max: u32) -> Self {
        self.max_queue_size = max;
        self
    }

    /// Set the upload chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}
