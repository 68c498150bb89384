//! Relay event emitter port.
//!
//! This port abstracts lifecycle event emission, allowing the relay manager
//! to emit events without coupling to transport details.

use crate::relay::RelayEvent;

/// Port for emitting relay lifecycle events.
///
/// Implementations handle the actual event delivery (channels, logs, chat
/// messages). This method should not block.
pub trait RelayEventEmitterPort: Send + Sync {
    /// Emit a relay event.
    fn emit(&self, event: RelayEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn RelayEventEmitterPort>;
}

/// A no-op emitter for tests and headless contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopRelayEmitter;

impl NoopRelayEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl RelayEventEmitterPort for NoopRelayEmitter {
    fn emit(&self, _event: RelayEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn RelayEventEmitterPort> {
        Box::new(self.clone())
    }
}
