//! Download manager implementation.
//!
//! The manager owns every named queue, routes control requests to the queue
//! named in the item's handle, and fans events out to observers.
//!
//! # Architecture
//!
//! - **Queues**: pure state machines (`crate::queue`), one mutex each
//! - **Transport**: performs transfers, reports back through a listener
//! - **Observers**: receive every event, in registration order
//!
//! # Concurrency Model
//!
//! - Lock order: queue registry → one queue (never two queues at once)
//! - Queue commands run under the queue's lock and append their events and
//!   effects to that queue's backlog (see `cell`)
//! - A single drainer per queue works the backlog off after the lock is
//!   released, so observers and transports may call back into the manager
//!   and still see every queue's work in mutation order
//! - Observers run on whichever thread is draining, never under a lock; a
//!   panicking observer is logged and skipped
//! - Lease-stamped transfer IDs reject callbacks from abandoned transfers

mod cell;
mod completion;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use indexmap::IndexMap;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use dlq_core::{
    Destination, DownloadError, DownloadHandle, DownloadManagerConfig, DownloadResult,
    ItemSnapshot, Payload, QueueEvent, QueueObserverPort, QueueSnapshot, TransferId,
    TransferListener, TransportPort,
};

use crate::observer::ChannelObserver;
use crate::queue::{DownloadQueue, Effect, Outcome};

use cell::{QueueCell, Step};

pub use completion::{DownloadCompletion, DownloadTicket};

type SharedQueue<M> = Arc<Mutex<QueueCell<M>>>;

/// Multi-queue download manager.
///
/// Cheap to clone; clones share the same queues and observers. `M` is the
/// caller's per-item metadata, stored and returned but never inspected.
pub struct DownloadManager<M = ()> {
    shared: Arc<Shared<M>>,
}

impl<M> Clone for DownloadManager<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<M> {
    config: DownloadManagerConfig,
    transport: Arc<dyn TransportPort>,
    queues: RwLock<IndexMap<Arc<str>, SharedQueue<M>>>,
    observers: RwLock<Vec<Arc<dyn QueueObserverPort>>>,
    /// Handed to the transport on every start. Holds only a weak reference,
    /// so in-flight transfers never keep the manager alive.
    listener: Arc<dyn TransferListener>,
}

/// Routes transport callbacks back into the manager.
struct ManagerListener<M> {
    shared: Weak<Shared<M>>,
}

impl<M: Send + 'static> TransferListener for ManagerListener<M> {
    fn on_progress(&self, id: &TransferId, bytes_read: u64, bytes_expected: Option<u64>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_progress(id, bytes_read, bytes_expected);
        }
    }

    fn on_success(&self, id: &TransferId, payload: Payload) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_success(id, payload);
        }
    }

    fn on_failure(&self, id: &TransferId, error: DownloadError) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_failure(id, error);
        }
    }
}

impl<M: Send + 'static> DownloadManager<M> {
    /// Create a manager with the default configuration.
    pub fn new(transport: Arc<dyn TransportPort>) -> Self {
        Self::with_config(transport, DownloadManagerConfig::default())
    }

    /// Create a manager with an explicit configuration.
    pub fn with_config(transport: Arc<dyn TransportPort>, config: DownloadManagerConfig) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<Shared<M>>| {
            let listener: Arc<dyn TransferListener> = Arc::new(ManagerListener {
                shared: weak.clone(),
            });
            Shared {
                config,
                transport,
                queues: RwLock::new(IndexMap::new()),
                observers: RwLock::new(Vec::new()),
                listener,
            }
        });
        Self { shared }
    }

    /// The manager configuration.
    pub fn config(&self) -> &DownloadManagerConfig {
        &self.shared.config
    }

    // =========================================================================
    // Queues
    // =========================================================================

    /// Create a queue with the configured default concurrency bound.
    pub fn create_queue(&self, name: &str) -> DownloadResult<()> {
        self.create_queue_with_limit(name, self.shared.config.default_max_concurrent)
    }

    /// Create a queue running at most `max_concurrent` transfers at once.
    ///
    /// Fails with `QueueExists` if the name is taken and with
    /// `InvalidConcurrency` if `max_concurrent` is zero. Nothing changes on
    /// failure.
    pub fn create_queue_with_limit(&self, name: &str, max_concurrent: u32) -> DownloadResult<()> {
        let queue = DownloadQueue::new(name, max_concurrent)?;

        let mut queues = write(&self.shared.queues);
        if queues.contains_key(name) {
            tracing::debug!(target: "dlq.download", queue = name, "Queue already exists");
            return Err(DownloadError::queue_exists(name));
        }
        queues.insert(
            Arc::clone(queue.name_arc()),
            Arc::new(Mutex::new(QueueCell::new(queue))),
        );
        drop(queues);

        tracing::info!(
            target: "dlq.download",
            queue = name,
            max_concurrent,
            "Created queue"
        );
        Ok(())
    }

    /// Names of all queues, in creation order.
    pub fn queue_names(&self) -> Vec<String> {
        read(&self.shared.queues)
            .keys()
            .map(ToString::to_string)
            .collect()
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Submit a download to the named queue.
    ///
    /// The item starts at once if the queue has a free slot and waits
    /// otherwise. The ticket's completion resolves exactly once.
    pub fn download(
        &self,
        url: Url,
        queue: &str,
        metadata: M,
        destination: Destination,
    ) -> DownloadResult<DownloadTicket> {
        let shared_queue = self
            .shared
            .queue(queue)
            .ok_or_else(|| DownloadError::unknown_queue(queue))?;

        let (tx, rx) = oneshot::channel();
        let (id, queue_name, active, pending, must_drain) = {
            let mut cell = lock(&shared_queue);
            let (id, outcome) = cell.queue.enqueue(url, metadata, destination, tx);
            (
                id,
                Arc::clone(cell.queue.name_arc()),
                cell.queue.active_count(),
                cell.queue.pending_count(),
                cell.push(outcome),
            )
        };

        tracing::info!(
            target: "dlq.download",
            queue,
            item = %id,
            active,
            pending,
            "Queued download"
        );
        if must_drain {
            self.shared.drain(&shared_queue);
        }

        Ok(DownloadTicket {
            handle: DownloadHandle::new(id, queue_name),
            completion: DownloadCompletion::new(rx),
        })
    }

    /// Pause a running item, freeing its slot.
    ///
    /// Returns `false` if the item is unknown, waiting, already paused, or
    /// finished.
    pub fn pause(&self, handle: &DownloadHandle) -> bool {
        let applied = self
            .shared
            .command(handle.queue(), |queue| queue.pause(handle.id()));
        if applied {
            tracing::debug!(target: "dlq.download", item = %handle, "Paused download");
        }
        applied
    }

    /// Resume a paused item.
    ///
    /// If its queue is saturated the item waits at its current position.
    /// Returns `false` unless the item was paused.
    pub fn resume(&self, handle: &DownloadHandle) -> bool {
        let applied = self
            .shared
            .command(handle.queue(), |queue| queue.resume(handle.id()));
        if applied {
            tracing::debug!(target: "dlq.download", item = %handle, "Resumed download");
        }
        applied
    }

    /// Cancel a waiting or running item and drop it from its queue.
    ///
    /// Returns `false` if the item is unknown or already finished.
    pub fn cancel(&self, handle: &DownloadHandle) -> bool {
        let applied = self
            .shared
            .command(handle.queue(), |queue| queue.cancel(handle.id()));
        if applied {
            tracing::info!(target: "dlq.download", item = %handle, "Cancelled download");
        }
        applied
    }

    /// Whether the item is tracked and paused.
    pub fn is_paused(&self, handle: &DownloadHandle) -> bool {
        self.shared
            .queue(handle.queue())
            .is_some_and(|cell| lock(&cell).queue.is_paused(handle.id()))
    }

    /// Cancel every item in one queue. Returns how many were cancelled.
    pub fn cancel_all(&self, queue: &str) -> usize {
        let Some(shared_queue) = self.shared.queue(queue) else {
            return 0;
        };
        let (cancelled, must_drain) = {
            let mut cell = lock(&shared_queue);
            if cell.queue.is_empty() {
                return 0;
            }
            let outcome = cell.queue.cancel_all();
            (outcome.events.len(), cell.push(outcome))
        };
        if must_drain {
            self.shared.drain(&shared_queue);
        }

        if cancelled > 0 {
            tracing::info!(target: "dlq.download", queue, cancelled, "Cancelled all downloads");
        }
        cancelled
    }

    /// Cancel every item in every queue. Returns how many were cancelled.
    pub fn shutdown(&self) -> usize {
        let cancelled = self
            .queue_names()
            .iter()
            .map(|name| self.cancel_all(name))
            .sum();
        tracing::info!(target: "dlq.download", cancelled, "Download manager shut down");
        cancelled
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Register an observer for every event of every queue.
    pub fn subscribe(&self, observer: Arc<dyn QueueObserverPort>) {
        write(&self.shared.observers).push(observer);
    }

    /// Register a channel observer and return its receiving end.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<QueueEvent> {
        let (observer, rx) = ChannelObserver::new();
        self.subscribe(Arc::new(observer));
        rx
    }
}

impl<M: Clone + Send + 'static> DownloadManager<M> {
    /// Snapshot of the items in one queue, in queue order.
    pub fn items(&self, queue: &str) -> DownloadResult<Vec<ItemSnapshot<M>>> {
        let shared_queue = self
            .shared
            .queue(queue)
            .ok_or_else(|| DownloadError::unknown_queue(queue))?;
        let items = lock(&shared_queue).queue.items();
        Ok(items)
    }

    /// Snapshot of one queue.
    pub fn snapshot(&self, queue: &str) -> DownloadResult<QueueSnapshot<M>> {
        let shared_queue = self
            .shared
            .queue(queue)
            .ok_or_else(|| DownloadError::unknown_queue(queue))?;
        let snapshot = lock(&shared_queue).queue.snapshot();
        Ok(snapshot)
    }
}

impl<M: Send + 'static> Shared<M> {
    fn queue(&self, name: &str) -> Option<SharedQueue<M>> {
        read(&self.queues).get(name).cloned()
    }

    /// Run a queue command and work off what it left behind. Returns
    /// whether the command applied.
    fn command<F>(&self, queue: &str, f: F) -> bool
    where
        F: FnOnce(&mut DownloadQueue<M>) -> Option<Outcome>,
    {
        let Some(shared_queue) = self.queue(queue) else {
            return false;
        };
        let (applied, must_drain) = {
            let mut cell = lock(&shared_queue);
            match f(&mut cell.queue) {
                Some(outcome) => (true, cell.push(outcome)),
                None => (false, false),
            }
        };
        if must_drain {
            self.drain(&shared_queue);
        }
        applied
    }

    // =========================================================================
    // Transport callbacks
    // =========================================================================

    fn handle_progress(&self, id: &TransferId, bytes_read: u64, bytes_expected: Option<u64>) {
        let applied = self.command(id.queue(), |queue| {
            queue.progress(id, bytes_read, bytes_expected)
        });
        if !applied {
            tracing::debug!(target: "dlq.download", transfer = %id, "Ignoring stale progress");
        }
    }

    fn handle_success(&self, id: &TransferId, payload: Payload) {
        if self.command(id.queue(), |queue| queue.complete(id, payload)) {
            tracing::info!(target: "dlq.download", transfer = %id, "Download completed");
        } else {
            tracing::debug!(target: "dlq.download", transfer = %id, "Ignoring stale completion");
        }
    }

    fn handle_failure(&self, id: &TransferId, error: DownloadError) {
        let message = error.to_string();
        if self.command(id.queue(), |queue| queue.fail(id, error)) {
            tracing::warn!(target: "dlq.download", transfer = %id, error = %message, "Download failed");
        } else {
            tracing::debug!(target: "dlq.download", transfer = %id, "Ignoring stale failure");
        }
    }

    // =========================================================================
    // Backlog draining
    // =========================================================================

    /// Work off a queue's backlog. Only the caller that became the drainer
    /// in `QueueCell::push` may call this, and never with the lock held.
    fn drain(&self, shared_queue: &SharedQueue<M>) {
        let _release = ReleaseOnUnwind(shared_queue);
        loop {
            // The guard must not outlive this statement: steps re-enter.
            let step = lock(shared_queue).next_step();
            match step {
                Some(Step::Notify(event)) => self.dispatch(&event),
                Some(Step::Apply(effect)) => self.apply(effect),
                None => return,
            }
        }
    }

    fn dispatch(&self, event: &QueueEvent) {
        // Snapshot the list so observers can subscribe others while notified.
        let observers = read(&self.observers).clone();
        for observer in &observers {
            // A panicking observer must not strand the rest of the backlog.
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer.notify(event))) {
                tracing::error!(
                    target: "dlq.download",
                    item = %event.item(),
                    kind = ?event.kind(),
                    reason = panic_message(payload.as_ref()),
                    "Observer panicked"
                );
            }
        }
    }

    fn apply(&self, effect: Effect) {
        match effect {
            Effect::Start(request) => {
                let id = request.id.clone();
                tracing::info!(target: "dlq.download", transfer = %id, url = %request.url, "Starting transfer");
                if let Err(error) = self.transport.start(request, Arc::clone(&self.listener)) {
                    self.handle_failure(&id, error);
                }
            }
            Effect::Resume(id) => {
                tracing::debug!(target: "dlq.download", transfer = %id, "Resuming transfer");
                self.transport.resume(&id);
            }
            Effect::Pause(id) => self.transport.pause(&id),
            Effect::Cancel(id) => self.transport.cancel(&id),
            Effect::Resolve { completion, result } => {
                // The caller may have dropped the completion; that is fine.
                let _ = completion.send(result);
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Hands the drainer role back if a transport panics mid-drain,
/// so the queue does not stall for every later caller.
struct ReleaseOnUnwind<'a, M>(&'a SharedQueue<M>);

impl<M> Drop for ReleaseOnUnwind<'_, M> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(self.0).release();
        }
    }
}

// =============================================================================
// Lock helpers
// =============================================================================
//
// Queue state stays consistent across a panicking observer because observers
// only run after the lock is released, so poisoning is safe to ignore.

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
