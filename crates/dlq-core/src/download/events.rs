//! Queue events - discriminated union for all item state changes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;
use super::types::{ItemId, Payload};

/// One event per item state transition, delivered to every observer.
///
/// Every variant carries the queue name, the item, and the item's zero-based
/// position among the queue's tracked items at the moment the event was
/// produced. Terminal events report the position the item held just before
/// it was removed.
///
/// Serialized form (for UIs and logs):
///
/// ```json
/// { "type": "item_progress", "queue": "q", "item": "…", "order_in_queue": 0,
///   "bytes_read": 512, "bytes_expected": 1024, "progress": 0.5 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    /// Bytes arrived for a running item.
    ItemProgress {
        /// Queue holding the item.
        queue: String,
        /// The item.
        item: ItemId,
        /// Current position in the queue.
        order_in_queue: usize,
        /// Total bytes received so far.
        bytes_read: u64,
        /// Total bytes expected, if the server announced it.
        #[serde(skip_serializing_if = "Option::is_none")]
        bytes_expected: Option<u64>,
        /// Fraction complete in `[0.0, 1.0]`.
        progress: f32,
    },

    /// An item was admitted and its transfer started (or resumed after waiting).
    ItemStarted {
        /// Queue holding the item.
        queue: String,
        /// The item.
        item: ItemId,
        /// Current position in the queue.
        order_in_queue: usize,
    },

    /// An item was paused and gave its slot back.
    ItemPaused {
        /// Queue holding the item.
        queue: String,
        /// The item.
        item: ItemId,
        /// Current position in the queue.
        order_in_queue: usize,
    },

    /// A paused item's pause flag was cleared.
    ItemResumed {
        /// Queue holding the item.
        queue: String,
        /// The item.
        item: ItemId,
        /// Current position in the queue.
        order_in_queue: usize,
    },

    /// An item was cancelled and removed from its queue.
    ItemCancelled {
        /// Queue that held the item.
        queue: String,
        /// The item.
        item: ItemId,
        /// Position the item held when it was removed.
        order_in_queue: usize,
    },

    /// An item's transfer finished successfully.
    ItemCompleted {
        /// Queue that held the item.
        queue: String,
        /// The item.
        item: ItemId,
        /// Position the item held when it was removed.
        order_in_queue: usize,
        /// The downloaded file or data.
        payload: Payload,
    },

    /// An item's transfer failed.
    ItemFailed {
        /// Queue that held the item.
        queue: String,
        /// The item.
        item: ItemId,
        /// Position the item held when it was removed.
        order_in_queue: usize,
        /// The transport's error.
        error: DownloadError,
    },
}

/// Discriminant of a [`QueueEvent`], for filtering and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// See [`QueueEvent::ItemProgress`].
    Progress,
    /// See [`QueueEvent::ItemStarted`].
    Started,
    /// See [`QueueEvent::ItemPaused`].
    Paused,
    /// See [`QueueEvent::ItemResumed`].
    Resumed,
    /// See [`QueueEvent::ItemCancelled`].
    Cancelled,
    /// See [`QueueEvent::ItemCompleted`].
    Completed,
    /// See [`QueueEvent::ItemFailed`].
    Failed,
}

impl EventKind {
    /// Wire name, matching the serialized `type` tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Progress => "item_progress",
            Self::Started => "item_started",
            Self::Paused => "item_paused",
            Self::Resumed => "item_resumed",
            Self::Cancelled => "item_cancelled",
            Self::Completed => "item_completed",
            Self::Failed => "item_failed",
        }
    }

    /// Whether events of this kind end the item's lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Failed)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl QueueEvent {
    /// Create a progress event.
    ///
    /// The fraction is passed in rather than derived, since the queue keeps it
    /// monotonic across reports.
    pub fn progress(
        queue: impl Into<String>,
        item: ItemId,
        order_in_queue: usize,
        bytes_read: u64,
        bytes_expected: Option<u64>,
        progress: f32,
    ) -> Self {
        Self::ItemProgress {
            queue: queue.into(),
            item,
            order_in_queue,
            bytes_read,
            bytes_expected,
            progress,
        }
    }

    /// Create a started event.
    pub fn started(queue: impl Into<String>, item: ItemId, order_in_queue: usize) -> Self {
        Self::ItemStarted {
            queue: queue.into(),
            item,
            order_in_queue,
        }
    }

    /// Create a paused event.
    pub fn paused(queue: impl Into<String>, item: ItemId, order_in_queue: usize) -> Self {
        Self::ItemPaused {
            queue: queue.into(),
            item,
            order_in_queue,
        }
    }

    /// Create a resumed event.
    pub fn resumed(queue: impl Into<String>, item: ItemId, order_in_queue: usize) -> Self {
        Self::ItemResumed {
            queue: queue.into(),
            item,
            order_in_queue,
        }
    }

    /// Create a cancelled event.
    pub fn cancelled(queue: impl Into<String>, item: ItemId, order_in_queue: usize) -> Self {
        Self::ItemCancelled {
            queue: queue.into(),
            item,
            order_in_queue,
        }
    }

    /// Create a completed event.
    pub fn completed(
        queue: impl Into<String>,
        item: ItemId,
        order_in_queue: usize,
        payload: Payload,
    ) -> Self {
        Self::ItemCompleted {
            queue: queue.into(),
            item,
            order_in_queue,
            payload,
        }
    }

    /// Create a failed event.
    pub fn failed(
        queue: impl Into<String>,
        item: ItemId,
        order_in_queue: usize,
        error: DownloadError,
    ) -> Self {
        Self::ItemFailed {
            queue: queue.into(),
            item,
            order_in_queue,
            error,
        }
    }

    /// The event's discriminant.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ItemProgress { .. } => EventKind::Progress,
            Self::ItemStarted { .. } => EventKind::Started,
            Self::ItemPaused { .. } => EventKind::Paused,
            Self::ItemResumed { .. } => EventKind::Resumed,
            Self::ItemCancelled { .. } => EventKind::Cancelled,
            Self::ItemCompleted { .. } => EventKind::Completed,
            Self::ItemFailed { .. } => EventKind::Failed,
        }
    }

    /// Queue the event belongs to.
    #[must_use]
    pub fn queue(&self) -> &str {
        match self {
            Self::ItemProgress { queue, .. }
            | Self::ItemStarted { queue, .. }
            | Self::ItemPaused { queue, .. }
            | Self::ItemResumed { queue, .. }
            | Self::ItemCancelled { queue, .. }
            | Self::ItemCompleted { queue, .. }
            | Self::ItemFailed { queue, .. } => queue,
        }
    }

    /// Item the event is about.
    #[must_use]
    pub const fn item(&self) -> ItemId {
        match self {
            Self::ItemProgress { item, .. }
            | Self::ItemStarted { item, .. }
            | Self::ItemPaused { item, .. }
            | Self::ItemResumed { item, .. }
            | Self::ItemCancelled { item, .. }
            | Self::ItemCompleted { item, .. }
            | Self::ItemFailed { item, .. } => *item,
        }
    }

    /// The item's position in its queue when the event was produced.
    #[must_use]
    pub const fn order_in_queue(&self) -> usize {
        match self {
            Self::ItemProgress { order_in_queue, .. }
            | Self::ItemStarted { order_in_queue, .. }
            | Self::ItemPaused { order_in_queue, .. }
            | Self::ItemResumed { order_in_queue, .. }
            | Self::ItemCancelled { order_in_queue, .. }
            | Self::ItemCompleted { order_in_queue, .. }
            | Self::ItemFailed { order_in_queue, .. } => *order_in_queue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let item = ItemId::generate();
        let event = QueueEvent::progress("q", item, 2, 512, Some(1024), 0.5);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "item_progress");
        assert_eq!(json["queue"], "q");
        assert_eq!(json["order_in_queue"], 2);
        assert_eq!(json["bytes_expected"], 1024);
    }

    #[test]
    fn test_unknown_length_is_omitted() {
        let event = QueueEvent::progress("q", ItemId::generate(), 0, 10, None, 0.0);
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("bytes_expected").is_none());
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let item = ItemId::generate();
        let events = [
            QueueEvent::started("q", item, 0),
            QueueEvent::paused("q", item, 0),
            QueueEvent::resumed("q", item, 0),
            QueueEvent::cancelled("q", item, 0),
            QueueEvent::failed("q", item, 0, DownloadError::network("reset")),
        ];

        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.kind().as_str());
            assert_eq!(event.item(), item);
            assert_eq!(event.queue(), "q");
        }
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(EventKind::Completed.is_terminal());
        assert!(EventKind::Failed.is_terminal());
        assert!(EventKind::Cancelled.is_terminal());
        assert!(!EventKind::Paused.is_terminal());
        assert!(!EventKind::Progress.is_terminal());
    }
}
