//! Named, concurrency-bounded download queues.
//!
//! A [`DownloadManager`] owns any number of named queues. Each queue runs at
//! most `max_concurrent` transfers at once and admits waiting items strictly
//! in submission order. Items can be paused (giving their slot back),
//! resumed, and cancelled while they run.
//!
//! The network side is a port: anything implementing
//! [`TransportPort`](dlq_core::TransportPort) can drive the queues.
//! [`HttpTransport`] is the bundled `reqwest` implementation.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dlq_download::{Destination, DownloadManager, HttpTransport, HttpTransportConfig};
//!
//! # async fn demo() -> Result<(), dlq_download::DownloadError> {
//! let transport = Arc::new(HttpTransport::new(HttpTransportConfig::default())?);
//! let manager: DownloadManager = DownloadManager::new(transport);
//! manager.create_queue_with_limit("images", 2)?;
//!
//! let url = url::Url::parse("https://example.com/cat.png").expect("valid url");
//! let ticket = manager.download(url, "images", (), Destination::Memory)?;
//! let payload = ticket.completion.await?;
//! # let _ = payload;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - `queue` - per-queue state machine (pure, no I/O)
//! - `manager` - multi-queue routing, observer fan-out, completions
//! - `observer` - ready-made observers
//! - `progress` - progress throttling
//! - `transport` - `HttpTransport`

// Re-export core types for convenience
pub use dlq_core::{
    Destination, DownloadError, DownloadHandle, DownloadManagerConfig, DownloadResult, EventKind,
    ItemId, ItemSnapshot, ItemState, NoopObserver, Payload, QueueEvent, QueueObserverPort,
    QueueSnapshot, TransferId, TransferListener, TransferRequest, TransportPort,
};

// Internal modules (pub(crate) to keep implementation private)
pub(crate) mod progress;
pub(crate) mod queue;

mod manager;
mod observer;
mod transport;

pub use manager::{DownloadCompletion, DownloadManager, DownloadTicket};
pub use observer::{ChannelObserver, TracingObserver};
pub use progress::ProgressThrottle;
pub use transport::{HttpTransport, HttpTransportConfig, file_name_for};
