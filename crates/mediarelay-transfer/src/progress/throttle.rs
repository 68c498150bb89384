//! Progress throttling.
//!
//! Rate-limits progress updates so the reporting channel is neither flooded
//! nor left silent through long plateaus.

use std::time::{Duration, Instant};

use mediarelay_core::ThrottleWindow;

/// Rate-limiter for progress updates of one transfer.
///
/// Emits when the percentage changed and at least `min_interval` passed, or
/// when `max_interval` passed regardless of the percentage. The first call
/// always emits.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    last_percent: i16,
    last_emit: Option<Instant>,
    min_interval: Duration,
    max_interval: Duration,
}

impl ProgressThrottle {
    /// Create a throttle with the given intervals.
    pub const fn new(min_interval: Duration, max_interval: Duration) -> Self {
        Self {
            last_percent: -1,
            last_emit: None,
            min_interval,
            max_interval,
        }
    }

    /// Create a throttle from a configured window.
    pub const fn from_window(window: ThrottleWindow) -> Self {
        Self::new(window.min_interval(), window.max_interval())
    }

    /// Download cadence (3 s / 10 s).
    pub const fn download() -> Self {
        Self::from_window(ThrottleWindow::DOWNLOAD)
    }

    /// Upload cadence (5 s / 15 s).
    pub const fn upload() -> Self {
        Self::from_window(ThrottleWindow::UPLOAD)
    }

    /// Decide whether a progress update at `percent`, observed at `now`, should be emitted.
    pub fn should_emit(&mut self, percent: u8, now: Instant) -> bool {
        let emit = match self.last_emit {
            None => true,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                let changed = i16::from(percent) != self.last_percent;
                (changed && elapsed >= self.min_interval) || elapsed >= self.max_interval
            }
        };

        if emit {
            self.last_percent = i16::from(percent);
            self.last_emit = Some(now);
        }
        emit
    }

    /// `should_emit` against the current instant.
    pub fn should_emit_now(&mut self, percent: u8) -> bool {
        self.should_emit(percent, Instant::now())
    }

    /// Force the next check to return true.
    pub const fn reset(&mut self) {
        self.last_percent = -1;
        self.last_emit = None;
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::download()
    }
}
