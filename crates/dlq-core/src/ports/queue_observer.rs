//! Queue observer port.
//!
//! This port abstracts event delivery, allowing the manager to notify
//! listeners without coupling to how they present events (logs, progress
//! bars, channels, UI bridges).

use crate::download::QueueEvent;

/// Port for receiving queue events.
///
/// Observers are called synchronously, in registration order, after the
/// queue lock has been released. Each queue's events are delivered in order
/// by one thread at a time: usually the one that made the change, but if
/// another thread is already delivering that queue's events, that thread
/// delivers this one too. Implementations may call back into the manager but
/// should not block. A panicking observer is skipped for that event.
pub trait QueueObserverPort: Send + Sync {
    /// Receive one event.
    fn notify(&self, event: &QueueEvent);
}

/// An observer that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl NoopObserver {
    /// Create a new no-op observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl QueueObserverPort for NoopObserver {
    fn notify(&self, _event: &QueueEvent) {}
}

impl<F> QueueObserverPort for F
where
    F: Fn(&QueueEvent) + Send + Sync,
{
    fn notify(&self, event: &QueueEvent) {
        self(event);
    }
}
