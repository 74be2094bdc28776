//! Core domain types and ports for dlq.
//!
//! This crate has no I/O and no runtime dependencies. It defines:
//!
//! - `download` - identifiers, lifecycle states, errors, events and snapshots
//! - `ports` - the traits the engine consumes (transport) and exposes (observers)

pub mod download;
pub mod ports;

pub use download::{
    Destination, DownloadError, DownloadHandle, DownloadManagerConfig, DownloadResult,
    EventKind, ItemId, ItemSnapshot, ItemState, Payload, QueueEvent, QueueSnapshot,
};
pub use ports::{
    NoopObserver, QueueObserverPort, TransferId, TransferListener, TransferRequest,
    TransportPort,
};
