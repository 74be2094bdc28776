//! Port definitions.
//!
//! - `transport` - consumed by the engine: performs individual transfers
//! - `queue_observer` - exposed by the engine: receives item lifecycle events

mod queue_observer;
mod transport;

pub use queue_observer::{NoopObserver, QueueObserverPort};
pub use transport::{TransferId, TransferListener, TransferRequest, TransportPort};
