//! Ready-made queue observers.
//!
//! - [`ChannelObserver`] forwards events into an unbounded channel, for
//!   consumers that prefer a stream to a callback
//! - [`TracingObserver`] logs every event

use dlq_core::{QueueEvent, QueueObserverPort};
use tokio::sync::mpsc;

/// Forwards every event into an unbounded `mpsc` channel.
///
/// Sending never blocks, so it is safe to call from under any context. Events
/// sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<QueueEvent>,
}

impl ChannelObserver {
    /// Create the observer and its receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueueEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Whether the receiving end is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl QueueObserverPort for ChannelObserver {
    fn notify(&self, event: &QueueEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Logs every event under the `dlq.events` target.
///
/// Progress goes to `trace`, everything else to `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl QueueObserverPort for TracingObserver {
    fn notify(&self, event: &QueueEvent) {
        let kind = event.kind();
        if let QueueEvent::ItemProgress {
            bytes_read,
            progress,
            ..
        } = event
        {
            tracing::trace!(
                target: "dlq.events",
                queue = event.queue(),
                item = %event.item(),
                bytes_read,
                progress,
                "{}",
                kind.as_str()
            );
        } else {
            tracing::debug!(
                target: "dlq.events",
                queue = event.queue(),
                item = %event.item(),
                order = event.order_in_queue(),
                "{}",
                kind.as_str()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlq_core::ItemId;

    #[test]
    fn test_channel_observer_forwards_in_order() {
        let (observer, mut rx) = ChannelObserver::new();
        let item = ItemId::generate();

        observer.notify(&QueueEvent::started("q", item, 0));
        observer.notify(&QueueEvent::paused("q", item, 0));

        assert_eq!(rx.try_recv().unwrap(), QueueEvent::started("q", item, 0));
        assert_eq!(rx.try_recv().unwrap(), QueueEvent::paused("q", item, 0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        assert!(observer.is_closed());
        observer.notify(&QueueEvent::cancelled("q", ItemId::generate(), 0));
    }

    #[test]
    fn test_tracing_observer_accepts_all_kinds() {
        let item = ItemId::generate();
        let observer = TracingObserver;
        observer.notify(&QueueEvent::progress("q", item, 0, 10, Some(20), 0.5));
        observer.notify(&QueueEvent::started("q", item, 0));
    }
}
