//! Common test utilities.
//!
//! A recording transport that tests drive by hand, plus an observer that
//! keeps every event.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use dlq_download::{
    DownloadError, DownloadManager, EventKind, ItemId, Payload, QueueEvent, QueueObserverPort,
    TransferId, TransferListener, TransferRequest, TransportPort,
};
use url::Url;

// ── Transport ──────────────────────────────────────────────────────────────

/// One call the engine made into the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(TransferId),
    Pause(TransferId),
    Resume(TransferId),
    Cancel(TransferId),
}

/// Transport that records calls and finishes transfers only when told to.
///
/// Listeners are kept after cancellation so tests can deliver late callbacks.
#[derive(Default)]
pub struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    started: Mutex<HashMap<TransferId, (TransferRequest, Arc<dyn TransferListener>)>>,
    reject_starts: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later `start` fail with a network error.
    pub fn reject_starts(&self) {
        self.reject_starts.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Transfer IDs in the order they were started.
    pub fn starts(&self) -> Vec<TransferId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Start(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// The transfer started for `item`, if any.
    pub fn transfer_of(&self, item: ItemId) -> Option<TransferId> {
        self.starts().into_iter().find(|id| id.item() == item)
    }

    /// The request a transfer was started with.
    pub fn request(&self, id: &TransferId) -> TransferRequest {
        self.started.lock().unwrap()[id].0.clone()
    }

    pub fn progress(&self, id: &TransferId, read: u64, expected: Option<u64>) {
        self.listener(id).on_progress(id, read, expected);
    }

    pub fn succeed(&self, id: &TransferId, payload: Payload) {
        self.listener(id).on_success(id, payload);
    }

    pub fn succeed_with_bytes(&self, id: &TransferId, body: &'static [u8]) {
        self.succeed(id, Payload::Data(Bytes::from_static(body)));
    }

    pub fn fail(&self, id: &TransferId, error: DownloadError) {
        self.listener(id).on_failure(id, error);
    }

    // Cloned out so the callback runs without our lock held.
    fn listener(&self, id: &TransferId) -> Arc<dyn TransferListener> {
        Arc::clone(&self.started.lock().unwrap()[id].1)
    }
}

impl TransportPort for FakeTransport {
    fn start(
        &self,
        request: TransferRequest,
        listener: Arc<dyn TransferListener>,
    ) -> Result<(), DownloadError> {
        let id = request.id.clone();
        // Register the listener before the call becomes visible to
        // `transfer_of`, so other threads can drive it right away.
        self.started
            .lock()
            .unwrap()
            .insert(id.clone(), (request, listener));
        self.calls.lock().unwrap().push(Call::Start(id));

        if self.reject_starts.load(Ordering::SeqCst) {
            return Err(DownloadError::network("connection refused"));
        }
        Ok(())
    }

    fn pause(&self, id: &TransferId) {
        self.calls.lock().unwrap().push(Call::Pause(id.clone()));
    }

    fn resume(&self, id: &TransferId) {
        self.calls.lock().unwrap().push(Call::Resume(id.clone()));
    }

    fn cancel(&self, id: &TransferId) {
        self.calls.lock().unwrap().push(Call::Cancel(id.clone()));
    }
}

// ── Observer ───────────────────────────────────────────────────────────────

/// Observer that keeps every event it sees.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<QueueEvent>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Take all events recorded so far.
    pub fn drain(&self) -> Vec<QueueEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Events for one item, as `(kind, order_in_queue)`.
    pub fn for_item(&self, item: ItemId) -> Vec<(EventKind, usize)> {
        self.events()
            .iter()
            .filter(|event| event.item() == item)
            .map(|event| (event.kind(), event.order_in_queue()))
            .collect()
    }

    /// Number of terminal events recorded for one item.
    pub fn terminal_count(&self, item: ItemId) -> usize {
        self.events()
            .iter()
            .filter(|event| event.item() == item && event.kind().is_terminal())
            .count()
    }
}

impl QueueObserverPort for EventLog {
    fn notify(&self, event: &QueueEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Fixtures ───────────────────────────────────────────────────────────────

pub fn url(name: &str) -> Url {
    Url::parse(&format!("https://downloads.example.com/{name}")).unwrap()
}

/// Manager wired to a fake transport and an event log.
pub fn setup<M: Send + 'static>() -> (DownloadManager<M>, Arc<FakeTransport>, Arc<EventLog>) {
    let transport = FakeTransport::new();
    let manager = DownloadManager::new(transport.clone());
    let log = EventLog::new();
    manager.subscribe(log.clone());
    (manager, transport, log)
}
