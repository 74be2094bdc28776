//! Queue item and command-output types (internal implementation).
//!
//! These types are used internally by the queue state machine.
//! For API responses, use the DTO types from `dlq_core::download::queue`.

use dlq_core::{
    Destination, DownloadHandle, DownloadResult, ItemId, ItemSnapshot, ItemState, Payload,
    QueueEvent, TransferId, TransferRequest,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use url::Url;

/// Sending half of an item's completion channel.
pub type CompletionSender = oneshot::Sender<DownloadResult<Payload>>;

/// One tracked download inside a queue.
pub struct QueuedItem<M> {
    /// The item identifier.
    pub id: ItemId,
    /// Source URL.
    pub url: Url,
    /// Caller metadata, never inspected.
    pub metadata: M,
    /// Requested destination mode.
    pub destination: Destination,
    /// Lifecycle state.
    pub state: ItemState,
    /// Pause flag; only set while `InProgress`.
    pub is_paused: bool,
    /// Fraction complete, non-decreasing.
    pub progress: f32,
    /// The transfer started for this item, kept while paused so it can be
    /// resumed rather than restarted.
    pub transfer: Option<TransferId>,
    /// Resolved exactly once, on the terminal transition.
    completion: Option<CompletionSender>,
}

impl<M> QueuedItem<M> {
    /// Create an item in the `Unknown` state.
    pub fn new(
        url: Url,
        metadata: M,
        destination: Destination,
        completion: CompletionSender,
    ) -> Self {
        Self {
            id: ItemId::generate(),
            url,
            metadata,
            destination,
            state: ItemState::Unknown,
            is_paused: false,
            progress: 0.0,
            transfer: None,
            completion: Some(completion),
        }
    }

    /// Whether this item currently holds a concurrency slot.
    pub fn holds_slot(&self) -> bool {
        self.state == ItemState::InProgress && !self.is_paused
    }

    /// Whether a callback for `id` belongs to this item's current transfer.
    pub fn owns_transfer(&self, id: &TransferId) -> bool {
        self.transfer.as_ref() == Some(id)
    }

    /// Record a progress report, keeping the fraction monotonic and in range.
    ///
    /// An unknown or zero expected length leaves the fraction unchanged.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn record_progress(&mut self, bytes_read: u64, bytes_expected: Option<u64>) -> f32 {
        if let Some(expected) = bytes_expected.filter(|&e| e > 0) {
            let fraction = (bytes_read as f64 / expected as f64).clamp(0.0, 1.0) as f32;
            if fraction > self.progress {
                self.progress = fraction;
            }
        }
        self.progress
    }

    /// Move to a terminal state and hand out the completion sender.
    ///
    /// Returns `None` if the sender was already taken.
    pub fn finish(&mut self, state: ItemState) -> Option<CompletionSender> {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.is_paused = false;
        self.completion.take()
    }

    /// Build the snapshot DTO.
    pub fn to_snapshot(&self, queue: &Arc<str>, order_in_queue: usize) -> ItemSnapshot<M>
    where
        M: Clone,
    {
        ItemSnapshot {
            handle: DownloadHandle::new(self.id, Arc::clone(queue)),
            url: self.url.clone(),
            metadata: self.metadata.clone(),
            state: self.state,
            is_paused: self.is_paused,
            progress: self.progress,
            order_in_queue,
        }
    }
}

/// A side effect the queue asks its caller to perform outside the lock.
pub enum Effect {
    /// Start a new transfer.
    Start(TransferRequest),
    /// Continue a suspended transfer.
    Resume(TransferId),
    /// Suspend a running transfer.
    Pause(TransferId),
    /// Abort a transfer.
    Cancel(TransferId),
    /// Resolve an item's completion.
    Resolve {
        /// The item's completion sender.
        completion: CompletionSender,
        /// Terminal result.
        result: DownloadResult<Payload>,
    },
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start(request) => f.debug_tuple("Start").field(&request.id).finish(),
            Self::Resume(id) => f.debug_tuple("Resume").field(id).finish(),
            Self::Pause(id) => f.debug_tuple("Pause").field(id).finish(),
            Self::Cancel(id) => f.debug_tuple("Cancel").field(id).finish(),
            Self::Resolve { result, .. } => f.debug_struct("Resolve").field("result", result).finish(),
        }
    }
}

/// Output of one queue command: events to publish, then effects to apply.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Observer events, in the order the transitions happened.
    pub events: Vec<QueueEvent>,
    /// Side effects, in the order they must be applied.
    pub effects: Vec<Effect>,
}

impl Outcome {
    /// Whether the command changed nothing observable.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> QueuedItem<()> {
        let (tx, _rx) = oneshot::channel();
        QueuedItem::new(
            Url::parse("https://example.com/a.bin").unwrap(),
            (),
            Destination::Memory,
            tx,
        )
    }

    #[test]
    fn test_new_item_defaults() {
        let item = item();
        assert_eq!(item.state, ItemState::Unknown);
        assert!(!item.is_paused);
        assert!(item.transfer.is_none());
        assert!(!item.holds_slot());
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let mut item = item();
        assert!((item.record_progress(50, Some(100)) - 0.5).abs() < f32::EPSILON);
        // A smaller report never moves progress backwards.
        assert!((item.record_progress(10, Some(100)) - 0.5).abs() < f32::EPSILON);
        // Overshoot is clamped.
        assert!((item.record_progress(300, Some(100)) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_length_keeps_progress() {
        let mut item = item();
        item.record_progress(25, Some(100));
        assert!((item.record_progress(90, None) - 0.25).abs() < f32::EPSILON);
        assert!((item.record_progress(90, Some(0)) - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_finish_hands_out_sender_once() {
        let mut item = item();
        assert!(item.finish(ItemState::Complete).is_some());
        assert!(item.finish(ItemState::Failed).is_none());
    }
}
