//! Queue snapshot DTOs.
//!
//! Owned copies of queue state. Callers iterating a snapshot never observe
//! concurrent admission or removal.

use url::Url;

use super::types::{DownloadHandle, ItemState};

/// Point-in-time view of one tracked item.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemSnapshot<M> {
    /// Handle for control operations.
    pub handle: DownloadHandle,
    /// Source URL.
    pub url: Url,
    /// Caller-supplied metadata.
    pub metadata: M,
    /// Lifecycle state.
    pub state: ItemState,
    /// Whether the item is paused (only meaningful while `InProgress`).
    pub is_paused: bool,
    /// Fraction complete in `[0.0, 1.0]`.
    pub progress: f32,
    /// Zero-based position in the queue.
    pub order_in_queue: usize,
}

/// Point-in-time view of one queue.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueSnapshot<M> {
    /// Queue name.
    pub name: String,
    /// Concurrency bound.
    pub max_concurrent: u32,
    /// Items currently holding a slot.
    pub active_count: u32,
    /// Items waiting for a slot.
    pub pending_count: u32,
    /// All tracked items in queue order.
    pub items: Vec<ItemSnapshot<M>>,
}

impl<M> QueueSnapshot<M> {
    /// Whether the queue has nothing running and nothing waiting.
    ///
    /// Paused items do not count as busy.
    pub const fn is_idle(&self) -> bool {
        self.active_count == 0 && self.pending_count == 0
    }

    /// Number of paused items.
    pub fn paused_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_paused).count()
    }
}
