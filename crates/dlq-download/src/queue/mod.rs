//! Download queue management.
//!
//! This module provides a pure state machine for one named queue: its
//! ordered items, its concurrency bound, and its slot accounting. No I/O is
//! performed here; the manager applies the returned effects.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO, no tracing)
//! - Commands return an [`Outcome`]: events for observers, then effects
//! - Commands that do not apply return `None` and leave the queue untouched
//!
//! # Order Semantics
//!
//! - `order_in_queue` is the zero-based index among tracked items
//! - Items leave the sequence on completion, failure, or cancellation,
//!   shifting everything behind them forward
//! - Paused items stay in place and keep their position
//!
//! # Admission
//!
//! Whenever a slot frees up, pending items are admitted front to back until
//! the bound is reached. Hence, outside of a command, `active < max` implies
//! there is no pending item.

// Queue positions and counts stay far below u32::MAX in practice
#![allow(clippy::cast_possible_truncation)]

mod types;

use std::sync::Arc;

use dlq_core::{
    Destination, DownloadError, DownloadResult, ItemId, ItemSnapshot, ItemState, Payload,
    QueueEvent, QueueSnapshot, TransferId, TransferRequest,
};
use url::Url;

pub use types::{CompletionSender, Effect, Outcome, QueuedItem};

/// State of one named queue.
///
/// This is a sync type with no internal locking; the caller
/// (`DownloadManager`) is responsible for synchronization.
pub struct DownloadQueue<M> {
    name: Arc<str>,
    items: Vec<QueuedItem<M>>,
    max_concurrent: u32,
    active: u32,
    next_lease: u64,
}

impl<M> DownloadQueue<M> {
    /// Create an empty queue. `max_concurrent` must be at least 1.
    pub fn new(name: impl Into<Arc<str>>, max_concurrent: u32) -> DownloadResult<Self> {
        if max_concurrent == 0 {
            return Err(DownloadError::InvalidConcurrency { value: 0 });
        }
        Ok(Self {
            name: name.into(),
            items: Vec::new(),
            max_concurrent,
            active: 0,
            next_lease: 0,
        })
    }

    /// The queue name.
    pub const fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    /// The concurrency bound.
    pub const fn max_concurrent(&self) -> u32 {
        self.max_concurrent
    }

    /// Number of items currently holding a slot.
    pub const fn active_count(&self) -> u32 {
        self.active
    }

    /// Number of items waiting for a slot.
    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.state == ItemState::Pending)
            .count()
    }

    /// Whether the queue tracks no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current zero-based position of an item.
    pub fn order_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Look up a tracked item.
    pub fn get(&self, id: ItemId) -> Option<&QueuedItem<M>> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Whether an item is tracked and paused.
    pub fn is_paused(&self, id: ItemId) -> bool {
        self.get(id).is_some_and(|item| item.is_paused)
    }

    /// Append a new item and admit it if a slot is free.
    pub fn enqueue(
        &mut self,
        url: Url,
        metadata: M,
        destination: Destination,
        completion: CompletionSender,
    ) -> (ItemId, Outcome) {
        let mut item = QueuedItem::new(url, metadata, destination, completion);
        item.state = ItemState::Pending;
        let id = item.id;
        self.items.push(item);

        let mut outcome = Outcome::default();
        self.admit(&mut outcome);
        (id, outcome)
    }

    /// Pause a running item, giving its slot to the next pending item.
    ///
    /// Only applies to an `InProgress`, non-paused item.
    pub fn pause(&mut self, id: ItemId) -> Option<Outcome> {
        let index = self.order_of(id)?;
        let item = &mut self.items[index];
        if !item.holds_slot() {
            return None;
        }
        let transfer = item.transfer.clone()?;
        item.is_paused = true;
        self.active -= 1;

        let mut outcome = Outcome::default();
        outcome.events.push(QueueEvent::paused(&*self.name, id, index));
        outcome.effects.push(Effect::Pause(transfer));
        self.admit(&mut outcome);
        Some(outcome)
    }

    /// Clear a paused item's pause flag.
    ///
    /// With a free slot the transfer resumes at once; otherwise the item goes
    /// back to `Pending` at its current position and competes for the next
    /// slot ahead of anything queued behind it.
    pub fn resume(&mut self, id: ItemId) -> Option<Outcome> {
        let index = self.order_of(id)?;
        let has_slot = self.active < self.max_concurrent;
        let item = &mut self.items[index];
        if item.state != ItemState::InProgress || !item.is_paused {
            return None;
        }
        item.is_paused = false;

        let mut outcome = Outcome::default();
        outcome.events.push(QueueEvent::resumed(&*self.name, id, index));
        if has_slot {
            let transfer = item.transfer.clone()?;
            self.active += 1;
            outcome.effects.push(Effect::Resume(transfer));
        } else {
            item.state = ItemState::Pending;
        }
        Some(outcome)
    }

    /// Cancel a pending or in-progress item and drop its record.
    pub fn cancel(&mut self, id: ItemId) -> Option<Outcome> {
        let index = self.order_of(id)?;
        let mut item = self.items.remove(index);
        if item.holds_slot() {
            self.active -= 1;
        }

        let mut outcome = Outcome::default();
        outcome
            .events
            .push(QueueEvent::cancelled(&*self.name, id, index));
        if let Some(transfer) = item.transfer.take() {
            outcome.effects.push(Effect::Cancel(transfer));
        }
        if let Some(completion) = item.finish(ItemState::Cancelled) {
            outcome.effects.push(Effect::Resolve {
                completion,
                result: Err(DownloadError::Cancelled),
            });
        }
        self.admit(&mut outcome);
        Some(outcome)
    }

    /// Cancel every tracked item without admitting anything.
    ///
    /// Positions are reported as they were before the call.
    pub fn cancel_all(&mut self) -> Outcome {
        let mut outcome = Outcome::default();
        for (index, mut item) in self.items.drain(..).enumerate() {
            outcome
                .events
                .push(QueueEvent::cancelled(&*self.name, item.id, index));
            if let Some(transfer) = item.transfer.take() {
                outcome.effects.push(Effect::Cancel(transfer));
            }
            if let Some(completion) = item.finish(ItemState::Cancelled) {
                outcome.effects.push(Effect::Resolve {
                    completion,
                    result: Err(DownloadError::Cancelled),
                });
            }
        }
        self.active = 0;
        outcome
    }

    /// Record a progress report from the transport.
    ///
    /// Ignored unless `transfer` is the item's current transfer.
    pub fn progress(
        &mut self,
        transfer: &TransferId,
        bytes_read: u64,
        bytes_expected: Option<u64>,
    ) -> Option<Outcome> {
        let index = self.transfer_index(transfer)?;
        let item = &mut self.items[index];
        let fraction = item.record_progress(bytes_read, bytes_expected);

        let mut outcome = Outcome::default();
        outcome.events.push(QueueEvent::progress(
            &*self.name,
            item.id,
            index,
            bytes_read,
            bytes_expected,
            fraction,
        ));
        Some(outcome)
    }

    /// Finish an item successfully and admit the next pending item.
    pub fn complete(&mut self, transfer: &TransferId, payload: Payload) -> Option<Outcome> {
        let index = self.transfer_index(transfer)?;
        let (mut item, mut outcome) = self.remove_finished(index);
        item.progress = 1.0;
        outcome.events.push(QueueEvent::completed(
            &*self.name,
            item.id,
            index,
            payload.clone(),
        ));
        if let Some(completion) = item.finish(ItemState::Complete) {
            outcome.effects.push(Effect::Resolve {
                completion,
                result: Ok(payload),
            });
        }
        self.admit(&mut outcome);
        Some(outcome)
    }

    /// Finish an item with an error and admit the next pending item.
    pub fn fail(&mut self, transfer: &TransferId, error: DownloadError) -> Option<Outcome> {
        let index = self.transfer_index(transfer)?;
        let (mut item, mut outcome) = self.remove_finished(index);
        outcome.events.push(QueueEvent::failed(
            &*self.name,
            item.id,
            index,
            error.clone(),
        ));
        if let Some(completion) = item.finish(ItemState::Failed) {
            outcome.effects.push(Effect::Resolve {
                completion,
                result: Err(error),
            });
        }
        self.admit(&mut outcome);
        Some(outcome)
    }

    /// Snapshot of all tracked items in queue order.
    pub fn items(&self) -> Vec<ItemSnapshot<M>>
    where
        M: Clone,
    {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| item.to_snapshot(&self.name, index))
            .collect()
    }

    /// Snapshot of the whole queue.
    pub fn snapshot(&self) -> QueueSnapshot<M>
    where
        M: Clone,
    {
        QueueSnapshot {
            name: self.name.to_string(),
            max_concurrent: self.max_concurrent(),
            active_count: self.active_count(),
            pending_count: self.pending_count() as u32,
            items: self.items(),
        }
    }

    // --- Private helpers ---

    /// Admit pending items front to back while slots are free.
    fn admit(&mut self, outcome: &mut Outcome) {
        while self.active < self.max_concurrent {
            let Some(index) = self
                .items
                .iter()
                .position(|item| item.state == ItemState::Pending)
            else {
                break;
            };

            let lease = self.next_lease;
            let item = &mut self.items[index];
            item.state = ItemState::InProgress;
            self.active += 1;

            if let Some(transfer) = item.transfer.clone() {
                outcome.effects.push(Effect::Resume(transfer));
            } else {
                self.next_lease += 1;
                let transfer = TransferId::new(Arc::clone(&self.name), item.id, lease);
                item.transfer = Some(transfer.clone());
                outcome.effects.push(Effect::Start(TransferRequest {
                    id: transfer,
                    url: item.url.clone(),
                    destination: item.destination,
                }));
            }
            outcome
                .events
                .push(QueueEvent::started(&*self.name, item.id, index));
        }
        debug_assert!(self.active <= self.max_concurrent);
    }

    /// Index of the item whose current transfer is `transfer`.
    fn transfer_index(&self, transfer: &TransferId) -> Option<usize> {
        self.items.iter().position(|item| {
            item.owns_transfer(transfer) && !item.state.is_terminal()
        })
    }

    /// Remove a finishing item, releasing its slot if it held one.
    fn remove_finished(&mut self, index: usize) -> (QueuedItem<M>, Outcome) {
        let mut item = self.items.remove(index);
        if item.holds_slot() {
            self.active -= 1;
        }
        item.transfer = None;
        (item, Outcome::default())
    }
}
