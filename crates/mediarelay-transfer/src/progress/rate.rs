//! Average transfer rate since a leg started.

use std::time::Instant;

/// Measures bytes-per-second since construction.
#[derive(Debug, Clone, Copy)]
pub struct RateMeter {
    started_at: Instant,
}

impl RateMeter {
    /// Start measuring at `started_at`.
    pub const fn starting_at(started_at: Instant) -> Self {
        Self { started_at }
    }

    /// Start measuring now.
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    /// When measurement started.
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Average rate for `bytes` moved by `now`. `None` until time has passed.
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self, bytes: u64, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        (elapsed > 0.0).then(|| bytes as f64 / elapsed)
    }
}
