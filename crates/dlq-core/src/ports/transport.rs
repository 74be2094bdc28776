//! Transport port definition.
//!
//! The transport performs individual transfers. The engine never touches the
//! network; it only asks the transport to start, pause, resume or cancel a
//! transfer, and listens for the outcome.
//!
//! # Contract
//!
//! - `start` must return promptly; the transfer runs in the transport's own
//!   concurrency domain. An `Err` from `start` is treated as a transfer failure.
//! - `pause`, `resume` and `cancel` are fire-and-forget and must be no-ops for
//!   unknown or already-finished transfers.
//! - After `start` succeeds the transport reports exactly one of
//!   `on_success` / `on_failure`, unless the transfer was cancelled.
//! - Listener callbacks may arrive on any thread. Callbacks for a transfer the
//!   engine no longer tracks are ignored.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::download::{Destination, DownloadError, ItemId, Payload};

/// Identifies one transfer attempt.
///
/// Minted by the engine on admission. The lease number distinguishes attempts
/// so that callbacks from an abandoned transfer can never touch a newer one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransferId {
    queue: Arc<str>,
    item: ItemId,
    lease: u64,
}

impl TransferId {
    /// Create a transfer ID.
    pub const fn new(queue: Arc<str>, item: ItemId, lease: u64) -> Self {
        Self { queue, item, lease }
    }

    /// Queue holding the item.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// The item being transferred.
    #[must_use]
    pub const fn item(&self) -> ItemId {
        self.item
    }

    /// Lease number of this attempt.
    #[must_use]
    pub const fn lease(&self) -> u64 {
        self.lease
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.queue, self.item, self.lease)
    }
}

/// Everything a transport needs to run one transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    /// Transfer identity, echoed back in every callback.
    pub id: TransferId,
    /// Source URL.
    pub url: Url,
    /// Where to put the bytes.
    pub destination: Destination,
}

/// Callbacks from the transport into the engine.
pub trait TransferListener: Send + Sync {
    /// Bytes arrived. `bytes_expected` is `None` when the length is unknown.
    fn on_progress(&self, id: &TransferId, bytes_read: u64, bytes_expected: Option<u64>);

    /// The transfer finished and produced `payload`.
    fn on_success(&self, id: &TransferId, payload: Payload);

    /// The transfer failed.
    fn on_failure(&self, id: &TransferId, error: DownloadError);
}

/// Port for the component that performs transfers.
pub trait TransportPort: Send + Sync {
    /// Begin a transfer, reporting through `listener`.
    fn start(
        &self,
        request: TransferRequest,
        listener: Arc<dyn TransferListener>,
    ) -> Result<(), DownloadError>;

    /// Suspend a running transfer.
    fn pause(&self, id: &TransferId);

    /// Continue a suspended transfer.
    fn resume(&self, id: &TransferId);

    /// Abort a transfer. Its listener must not be called afterwards, though
    /// the engine tolerates late callbacks.
    fn cancel(&self, id: &TransferId);
}
